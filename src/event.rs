// MIT License - Copyright (c) 2026 Peter Wright
// Events delivered to the client handler

use std::fmt;

/// Kinds of events delivered to an [`EventHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ButtonPressed,
    ButtonReleased,
    ButtonHold,
    ButtonDoubleTap,
    KeypadLedChanged,
    LightChanged,
    KeypadEnableChanged,
    /// Synthetic: the controller rejected the configured credentials while
    /// the background loop was reconnecting.
    LoginIncorrect,
}

impl EventKind {
    /// The event name, as exposed to collaborators.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ButtonPressed => "button_pressed",
            Self::ButtonReleased => "button_released",
            Self::ButtonHold => "button_hold",
            Self::ButtonDoubleTap => "button_double_tap",
            Self::KeypadLedChanged => "keypad_led_changed",
            Self::LightChanged => "light_changed",
            Self::KeypadEnableChanged => "keypad_enable_changed",
            Self::LoginIncorrect => "login_incorrect",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed field value parsed from an inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Button number or dimmer level (0-100, as sent by the controller).
    Integer(i64),
    /// Keypad enabled flag.
    Flag(bool),
    /// One digit per keypad LED.
    LedStates(Vec<u8>),
}

impl FieldValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_led_states(&self) -> Option<&[u8]> {
        match self {
            Self::LedStates(v) => Some(v),
            _ => None,
        }
    }
}

/// An event produced from one controller line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeworksEvent {
    pub kind: EventKind,
    /// Device address exactly as the controller printed it, e.g. `[01:01:00:02:04]`.
    pub address: String,
    /// Fields following the address, in line order.
    pub values: Vec<FieldValue>,
}

impl HomeworksEvent {
    pub fn new(kind: EventKind, address: impl Into<String>, values: Vec<FieldValue>) -> Self {
        Self {
            kind,
            address: address.into(),
            values,
        }
    }

    pub(crate) fn login_incorrect() -> Self {
        Self::new(EventKind::LoginIncorrect, String::new(), Vec::new())
    }

    pub fn name(&self) -> &'static str {
        self.kind.as_str()
    }
}

/// Receives events from the client's background worker.
///
/// `on_event` runs on the worker task itself: while it executes no further
/// lines are read and no reconnect happens. Handlers that need to do slow
/// work should forward the event into a channel. Any
/// `Fn(HomeworksEvent)` closure is a handler.
pub trait EventHandler: Send + Sync + 'static {
    fn on_event(&self, event: HomeworksEvent);
}

impl<F> EventHandler for F
where
    F: Fn(HomeworksEvent) + Send + Sync + 'static,
{
    fn on_event(&self, event: HomeworksEvent) {
        self(event)
    }
}
