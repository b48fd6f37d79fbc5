//! Headless model of the pet window
//!
//! The windowing layer translates raw input into [`PetEvent`]s and hands
//! them to [`dispatch`], which calls the matching [`PetHandler`] method.

pub mod menu;

pub use menu::{MenuHandle, MenuKind, MenuTracker};

/// Something chosen from one of the menus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    OpenChat,
    OpenVideo,
    ShowGames,
    LaunchGame(usize),
    Search(String),
    CancelSearch,
    AddResult(usize),
    Back,
    CloseMenus,
    ConfirmDismiss,
    CancelDismiss,
}

/// Input delivered to the pet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PetEvent {
    /// Primary button pressed on the pet, pointer in screen coordinates
    DragStart { x: i32, y: i32 },
    /// Pointer moved while the button is held
    DragMove { x: i32, y: i32 },
    /// Right click: ask whether to dismiss the pet
    SecondaryClick,
    /// Double click: open the main menu
    DoubleClick,
    Menu(MenuAction),
}

/// Named handlers for every pet event
pub trait PetHandler {
    fn on_drag_start(&mut self, x: i32, y: i32);
    fn on_drag_move(&mut self, x: i32, y: i32);
    fn on_secondary_click(&mut self);
    fn on_double_click(&mut self);
    fn on_menu_action(&mut self, action: MenuAction);
}

/// Route an event to the handler method for it
pub fn dispatch<H: PetHandler + ?Sized>(handler: &mut H, event: PetEvent) {
    match event {
        PetEvent::DragStart { x, y } => handler.on_drag_start(x, y),
        PetEvent::DragMove { x, y } => handler.on_drag_move(x, y),
        PetEvent::SecondaryClick => handler.on_secondary_click(),
        PetEvent::DoubleClick => handler.on_double_click(),
        PetEvent::Menu(action) => handler.on_menu_action(action),
    }
}

/// Window position of the pet with drag tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pet {
    pub x: i32,
    pub y: i32,
    grab_offset: Option<(i32, i32)>,
}

impl Default for Pet {
    fn default() -> Self {
        Self::at(200, 50)
    }
}

impl Pet {
    pub fn at(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            grab_offset: None,
        }
    }

    /// Remember where on the pet the pointer grabbed it
    pub fn start_drag(&mut self, pointer_x: i32, pointer_y: i32) {
        self.grab_offset = Some((pointer_x - self.x, pointer_y - self.y));
    }

    /// Move so the grabbed point stays under the pointer; ignored without a grab
    pub fn drag_to(&mut self, pointer_x: i32, pointer_y: i32) {
        if let Some((dx, dy)) = self.grab_offset {
            self.x = pointer_x - dx;
            self.y = pointer_y - dy;
        }
    }

    pub fn end_drag(&mut self) {
        self.grab_offset = None;
    }
}
