mod delay;

pub use self::delay::{Delay, DelayError, DelayOperation, DelayOutput, Ticket};

#[cfg(feature = "native-delay")]
pub use self::delay::DelayDriver;

pub use crux_core::render::Render;

use crate::event::Event;

pub type AppRender = Render<Event>;
pub type AppDelay = Delay<Event>;

#[derive(crux_core::macros::Effect)]
#[effect(app = "crate::app::App")]
pub struct Capabilities {
    pub render: Render<Event>,
    pub delay: Delay<Event>,
}
