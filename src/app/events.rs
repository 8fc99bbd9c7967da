use crate::input::InputEvent;
use crate::player::PollReport;

/// What woke the control loop.
#[derive(Debug)]
pub enum AppEvent {
    Input(InputEvent),
    Poll(PollReport),
    Tick,
}
