//! Open-menu bookkeeping
//!
//! At most one menu of each kind is open at a time. Opening a kind that is
//! already open closes the previous instance first.

/// The menus the pet can show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuKind {
    /// Double-click menu with links, games and close
    Main,
    /// Games submenu opened from the main menu
    Games,
    /// Right-click "dismiss the pet?" prompt
    Dismiss,
}

/// Something on screen that can be closed
pub trait MenuHandle {
    fn close(&mut self);
}

/// Tracks the currently open menu of each kind
pub struct MenuTracker<H: MenuHandle> {
    main: Option<H>,
    games: Option<H>,
    dismiss: Option<H>,
}

impl<H: MenuHandle> Default for MenuTracker<H> {
    fn default() -> Self {
        Self {
            main: None,
            games: None,
            dismiss: None,
        }
    }
}

impl<H: MenuHandle> MenuTracker<H> {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, kind: MenuKind) -> &mut Option<H> {
        match kind {
            MenuKind::Main => &mut self.main,
            MenuKind::Games => &mut self.games,
            MenuKind::Dismiss => &mut self.dismiss,
        }
    }

    /// Show `handle` as the menu of `kind`, closing any previous one
    pub fn open(&mut self, kind: MenuKind, handle: H) {
        let slot = self.slot(kind);
        if let Some(mut previous) = slot.take() {
            previous.close();
        }
        *slot = Some(handle);
    }

    /// Close the menu of `kind`; returns whether one was open
    pub fn close(&mut self, kind: MenuKind) -> bool {
        match self.slot(kind).take() {
            Some(mut handle) => {
                handle.close();
                true
            }
            None => false,
        }
    }

    /// Close the games submenu, then the main menu
    pub fn close_all(&mut self) {
        self.close(MenuKind::Games);
        self.close(MenuKind::Main);
    }

    pub fn is_open(&self, kind: MenuKind) -> bool {
        match kind {
            MenuKind::Main => self.main.is_some(),
            MenuKind::Games => self.games.is_some(),
            MenuKind::Dismiss => self.dismiss.is_some(),
        }
    }
}
