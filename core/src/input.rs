//! Per-frame input snapshot handed to the game layer
//!
//! Buttons record both their final state and how many times they changed
//! during the frame, so a press and release inside one frame is not lost.

/// Keyboard plus four gamepads
pub const MAX_CONTROLLERS: usize = 5;

/// Digital button state for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonState {
    /// State changes seen this frame
    pub half_transition_count: u32,
    /// Whether the button was held at the end of the frame
    pub ended_down: bool,
}

impl ButtonState {
    /// Apply a new physical state; counts a transition only when it changes
    pub fn process(&mut self, is_down: bool) {
        if self.ended_down != is_down {
            self.ended_down = is_down;
            self.half_transition_count += 1;
        }
    }

    /// Went down at least once this frame
    pub fn was_pressed(&self) -> bool {
        self.half_transition_count > 1 || (self.half_transition_count == 1 && self.ended_down)
    }
}

/// Buttons and sticks of one controller
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControllerInput {
    pub is_connected: bool,
    pub is_analog: bool,
    /// Average stick position over the frame, -1.0..=1.0
    pub stick_average_x: f32,
    pub stick_average_y: f32,

    pub move_up: ButtonState,
    pub move_down: ButtonState,
    pub move_left: ButtonState,
    pub move_right: ButtonState,

    pub action_up: ButtonState,
    pub action_down: ButtonState,
    pub action_left: ButtonState,
    pub action_right: ButtonState,

    pub left_shoulder: ButtonState,
    pub right_shoulder: ButtonState,

    pub back: ButtonState,
    pub start: ButtonState,
}

impl ControllerInput {
    /// All buttons, in declaration order
    pub fn buttons(&self) -> [&ButtonState; 12] {
        [
            &self.move_up,
            &self.move_down,
            &self.move_left,
            &self.move_right,
            &self.action_up,
            &self.action_down,
            &self.action_left,
            &self.action_right,
            &self.left_shoulder,
            &self.right_shoulder,
            &self.back,
            &self.start,
        ]
    }

    fn buttons_mut(&mut self) -> [&mut ButtonState; 12] {
        [
            &mut self.move_up,
            &mut self.move_down,
            &mut self.move_left,
            &mut self.move_right,
            &mut self.action_up,
            &mut self.action_down,
            &mut self.action_left,
            &mut self.action_right,
            &mut self.left_shoulder,
            &mut self.right_shoulder,
            &mut self.back,
            &mut self.start,
        ]
    }
}

/// Input for one game tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GameInput {
    /// Seconds of game time this tick covers
    pub dt_for_frame: f32,
    /// Index 0 is the keyboard
    pub controllers: [ControllerInput; MAX_CONTROLLERS],
}

impl GameInput {
    /// Start a new frame: held buttons stay down, transition counts reset
    pub fn begin_frame(&mut self) {
        for controller in &mut self.controllers {
            for button in controller.buttons_mut() {
                button.half_transition_count = 0;
            }
        }
    }

    /// Controller at `index`, if it exists
    pub fn controller(&self, index: usize) -> Option<&ControllerInput> {
        self.controllers.get(index)
    }

    /// Mutable controller at `index`, if it exists
    pub fn controller_mut(&mut self, index: usize) -> Option<&mut ControllerInput> {
        self.controllers.get_mut(index)
    }
}
