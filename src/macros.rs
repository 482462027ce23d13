// ABOUTME: This module provides macros to reduce boilerplate in SMGP configuration types
// ABOUTME: Generates consuming builder-style setters for plain configuration fields

/// Macro for generating builder-style setters on configuration structs
///
/// Each listed field gets a method of the same name that takes the new value,
/// stores it and returns `self`, so configurations can be chained:
///
/// ```rust,ignore
/// let config = ClientConfig::new("127.0.0.1", 7890, "10001", "secret")
///     .heartbeat_interval(Duration::from_secs(30))
///     .heartbeat_max_attempts(5);
/// ```
///
/// Fields of type `String` accept anything convertible into a `String`.
macro_rules! config_setters {
    ($($(#[$doc:meta])* $field:ident: String),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $field(mut self, $field: impl Into<String>) -> Self {
                self.$field = $field.into();
                self
            }
        )*
    };
    ($($(#[$doc:meta])* $field:ident: $type:ty),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $field(mut self, $field: $type) -> Self {
                self.$field = $field;
                self
            }
        )*
    };
}

pub(crate) use config_setters;
