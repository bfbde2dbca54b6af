//! Built-in capability modules
//!
//! Modules shipped with the crate that other modules consume through the
//! registry's lookup surface: the event bus, the settings store and the
//! execution driver.

pub mod events;
pub mod execute;
pub mod settings;

pub use events::{handler, Event, EventHandler, EventManager, SubscriptionId, EVENT_CATEGORY};
pub use execute::{ExecuteModule, EXECUTE_CATEGORY, EXECUTE_START_EVENT, EXECUTE_STOP_EVENT};
pub use settings::{default_settings, SettingsStore, SETTINGS_CATEGORY};
