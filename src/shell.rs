//! Interactive console standing in for the pet window
//!
//! Each input line becomes a [`PetEvent`]. Search results stream in through
//! the poll ticker while the console waits for the next line.

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use pet_launcher_core::{SearchEvent, SearchRequest, SearchResult};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, warn};

use crate::config::Config;
use crate::games::{self, Catalog};
use crate::overlay::{
    dispatch, MenuAction, MenuHandle, MenuKind, MenuTracker, Pet, PetEvent, PetHandler,
};
use crate::platform;
use crate::search::{resolver_for, SearchSession, Ticker};

const HELP: &str = "\
commands:
  menu                 open the main menu (double click)
  dismiss              ask to dismiss the pet (right click)
  grab X Y / move X Y  drag the pet
  chat | video         open the configured websites
  games                show the games menu
  launch N             launch game N
  search TERM          search for games and shortcuts
  cancel               cancel the running search
  add N                add search result N to the games menu
  back | close         close the games menu / all menus
  yes | no             answer the dismiss prompt
  help";

/// Menu printed to the console
struct ConsoleMenu {
    kind: MenuKind,
}

impl ConsoleMenu {
    fn show(kind: MenuKind, lines: &[String]) -> Self {
        println!("┌─ {:?} menu", kind);
        for line in lines {
            println!("│ {}", line);
        }
        println!("└─");
        Self { kind }
    }
}

impl MenuHandle for ConsoleMenu {
    fn close(&mut self) {
        debug!("{:?} menu closed", self.kind);
    }
}

/// Parse one console line into an event
pub fn parse_line(line: &str) -> Option<PetEvent> {
    let line = line.trim();
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    let coords = |rest: &str| -> Option<(i32, i32)> {
        let mut parts = rest.split_whitespace();
        let x = parts.next()?.parse().ok()?;
        let y = parts.next()?.parse().ok()?;
        Some((x, y))
    };

    let event = match command {
        "menu" => PetEvent::DoubleClick,
        "dismiss" => PetEvent::SecondaryClick,
        "grab" => {
            let (x, y) = coords(rest)?;
            PetEvent::DragStart { x, y }
        }
        "move" => {
            let (x, y) = coords(rest)?;
            PetEvent::DragMove { x, y }
        }
        "chat" => PetEvent::Menu(MenuAction::OpenChat),
        "video" => PetEvent::Menu(MenuAction::OpenVideo),
        "games" => PetEvent::Menu(MenuAction::ShowGames),
        "launch" => PetEvent::Menu(MenuAction::LaunchGame(rest.parse().ok()?)),
        "search" if !rest.is_empty() => PetEvent::Menu(MenuAction::Search(rest.to_string())),
        "cancel" => PetEvent::Menu(MenuAction::CancelSearch),
        "add" => PetEvent::Menu(MenuAction::AddResult(rest.parse().ok()?)),
        "back" => PetEvent::Menu(MenuAction::Back),
        "close" => PetEvent::Menu(MenuAction::CloseMenus),
        "yes" => PetEvent::Menu(MenuAction::ConfirmDismiss),
        "no" => PetEvent::Menu(MenuAction::CancelDismiss),
        _ => return None,
    };
    Some(event)
}

/// Console session state
pub struct Shell {
    config: Config,
    pet: Pet,
    menus: MenuTracker<ConsoleMenu>,
    session: Arc<Mutex<SearchSession>>,
    results: Arc<Mutex<Vec<SearchResult>>>,
    ticker: Option<Ticker>,
    running: bool,
}

impl Shell {
    pub fn new(config: Config) -> Self {
        let resolver = resolver_for(config.search.resolve_shortcuts);
        Self {
            config,
            pet: Pet::default(),
            menus: MenuTracker::new(),
            session: Arc::new(Mutex::new(SearchSession::new(resolver))),
            results: Arc::new(Mutex::new(Vec::new())),
            ticker: None,
            running: true,
        }
    }

    /// Read commands from stdin until the pet is dismissed or input ends
    pub async fn run(mut self) -> Result<()> {
        println!("{}", HELP);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        while self.running {
            let Some(line) = lines.next_line().await? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            if line.trim() == "help" {
                println!("{}", HELP);
                continue;
            }

            match parse_line(&line) {
                Some(event) => dispatch(&mut self, event),
                None => println!("unknown command, try 'help'"),
            }
        }

        self.shutdown().await;
        Ok(())
    }

    async fn shutdown(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.stop().await;
        }
        off_runtime(|| lock(&self.session).stop());
        self.menus.close_all();
        self.menus.close(MenuKind::Dismiss);
    }

    fn start_search(&mut self, term: &str) {
        let request = match SearchRequest::new(term, self.config.root_set()) {
            Ok(request) => request,
            Err(e) => {
                println!("{}", e);
                return;
            }
        };

        // The old ticker breaks on its own once the generation moves on
        if self.ticker.take().is_some_and(|ticker| ticker.is_active()) {
            debug!("Replacing the result poller of the previous search");
        }

        // Bump the generation before clearing, so a late tick of the old
        // poller sees the new generation and leaves the list alone
        let generation = match off_runtime(|| lock(&self.session).start(request)) {
            Ok(generation) => generation,
            Err(e) => {
                warn!("{}", e);
                println!("{}", e);
                return;
            }
        };
        lock(&self.results).clear();
        println!("searching for '{}'...", term);

        let session = Arc::clone(&self.session);
        let results = Arc::clone(&self.results);
        self.ticker = Some(Ticker::start(self.config.poll_interval(), move || {
            collect_batch(&session, &results, generation)
        }));
    }

    fn show_games(&mut self) {
        let lines: Vec<String> = self
            .config
            .games
            .iter()
            .enumerate()
            .map(|(i, game)| format!("[{}] {}", i, game.name))
            .chain(["back".to_string()])
            .collect();
        self.menus.open(MenuKind::Games, ConsoleMenu::show(MenuKind::Games, &lines));
    }

    fn open_link(&mut self, url: String) {
        if let Err(e) = platform::open_url(&url) {
            warn!("Failed to open {}: {}", url, e);
        }
        self.menus.close_all();
    }

    fn add_result(&mut self, index: usize) {
        let Some(result) = lock(&self.results).get(index).cloned() else {
            println!("no search result {}", index);
            return;
        };

        match Catalog::new(&mut self.config.games).add_from_result(&result) {
            Ok(entry) => println!("added {}", entry.name),
            Err(e) => {
                println!("{}", e);
                return;
            }
        }
        if let Err(e) = self.config.save() {
            warn!("Failed to save games: {:#}", e);
        }
    }
}

impl PetHandler for Shell {
    fn on_drag_start(&mut self, x: i32, y: i32) {
        self.pet.start_drag(x, y);
    }

    fn on_drag_move(&mut self, x: i32, y: i32) {
        self.pet.drag_to(x, y);
        println!("pet at +{}+{}", self.pet.x, self.pet.y);
    }

    fn on_secondary_click(&mut self) {
        self.pet.end_drag();
        let lines = vec!["Dismiss pet? (yes / no)".to_string()];
        self.menus.open(MenuKind::Dismiss, ConsoleMenu::show(MenuKind::Dismiss, &lines));
    }

    fn on_double_click(&mut self) {
        self.pet.end_drag();
        let lines = vec![
            "chat".to_string(),
            "video".to_string(),
            "games".to_string(),
            "search TERM".to_string(),
            "close".to_string(),
        ];
        self.menus.open(MenuKind::Main, ConsoleMenu::show(MenuKind::Main, &lines));
    }

    fn on_menu_action(&mut self, action: MenuAction) {
        match action {
            MenuAction::OpenChat => self.open_link(self.config.links.chat_url.clone()),
            MenuAction::OpenVideo => self.open_link(self.config.links.video_url.clone()),
            MenuAction::ShowGames => self.show_games(),
            MenuAction::LaunchGame(index) => match self.config.games.get(index) {
                Some(entry) => match games::launch(entry) {
                    Ok(pid) => println!("launched {} (pid {})", entry.name, pid),
                    Err(e) => println!("{}", e),
                },
                None => println!("no game {}", index),
            },
            MenuAction::Search(term) => self.start_search(&term),
            MenuAction::CancelSearch => {
                let session = lock(&self.session);
                if session.is_running() {
                    session.cancel();
                } else {
                    println!("no search running");
                }
            }
            MenuAction::AddResult(index) => self.add_result(index),
            MenuAction::Back => {
                self.menus.close(MenuKind::Games);
            }
            MenuAction::CloseMenus => self.menus.close_all(),
            // Only answers an open prompt
            MenuAction::ConfirmDismiss => {
                if self.menus.is_open(MenuKind::Dismiss) {
                    self.menus.close(MenuKind::Dismiss);
                    self.running = false;
                }
            }
            MenuAction::CancelDismiss => {
                self.menus.close(MenuKind::Dismiss);
            }
        }
    }
}

/// Move one batch of queued events for `generation` into `results`.
///
/// The results lock is held for the whole batch and the generation is checked
/// under it, so a batch of a replaced search never lands in the new list.
fn collect_batch(
    session: &Mutex<SearchSession>,
    results: &Mutex<Vec<SearchResult>>,
    generation: u64,
) -> ControlFlow<()> {
    let mut results = lock(results);
    let events = {
        let mut session = lock(session);
        // A newer search owns the queue now
        if session.current_generation() != generation {
            return ControlFlow::Break(());
        }
        session.poll()
    };

    for event in events {
        match event {
            SearchEvent::Found { generation: g, result } if g == generation => {
                println!(
                    "  [{}] {} -> {}",
                    results.len(),
                    result.display_name,
                    result.target_path.display()
                );
                results.push(result);
            }
            SearchEvent::Complete { generation: g, stats } if g == generation => {
                if stats.cancelled {
                    println!("search cancelled after {} results", results.len());
                } else if results.is_empty() {
                    println!("no games found");
                } else {
                    println!(
                        "search finished: {} results (add N to keep one)",
                        results.len()
                    );
                }
                return ControlFlow::Break(());
            }
            // Tail of the search this one replaced
            _ => {}
        }
    }
    ControlFlow::Continue(())
}

/// Run a call that may join a worker thread without stalling the runtime
fn off_runtime<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// Lock, recovering the data from a poisoned mutex
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use std::time::{Duration, Instant};

    #[test]
    fn parses_console_commands() {
        assert_eq!(parse_line("menu"), Some(PetEvent::DoubleClick));
        assert_eq!(parse_line(" dismiss "), Some(PetEvent::SecondaryClick));
        assert_eq!(parse_line("grab 10 20"), Some(PetEvent::DragStart { x: 10, y: 20 }));
        assert_eq!(parse_line("move -5 7"), Some(PetEvent::DragMove { x: -5, y: 7 }));
        assert_eq!(
            parse_line("search super mario"),
            Some(PetEvent::Menu(MenuAction::Search("super mario".to_string())))
        );
        assert_eq!(parse_line("launch 2"), Some(PetEvent::Menu(MenuAction::LaunchGame(2))));
        assert_eq!(parse_line("yes"), Some(PetEvent::Menu(MenuAction::ConfirmDismiss)));
    }

    #[test]
    fn rejects_malformed_commands() {
        assert_eq!(parse_line("search"), None);
        assert_eq!(parse_line("launch two"), None);
        assert_eq!(parse_line("grab 1"), None);
        assert_eq!(parse_line("dance"), None);
    }

    #[test]
    fn confirming_dismiss_stops_the_shell() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        let mut shell = Shell::new(config);

        dispatch(&mut shell, PetEvent::SecondaryClick);
        assert!(shell.menus.is_open(MenuKind::Dismiss));
        dispatch(&mut shell, PetEvent::Menu(MenuAction::CancelDismiss));
        assert!(shell.running);

        dispatch(&mut shell, PetEvent::SecondaryClick);
        dispatch(&mut shell, PetEvent::Menu(MenuAction::ConfirmDismiss));
        assert!(!shell.running);
        assert!(!shell.menus.is_open(MenuKind::Dismiss));
    }

    #[test]
    fn games_menu_closes_with_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        let mut shell = Shell::new(config);

        dispatch(&mut shell, PetEvent::DoubleClick);
        dispatch(&mut shell, PetEvent::Menu(MenuAction::ShowGames));
        assert!(shell.menus.is_open(MenuKind::Games));

        dispatch(&mut shell, PetEvent::Menu(MenuAction::Back));
        assert!(!shell.menus.is_open(MenuKind::Games));
        assert!(shell.menus.is_open(MenuKind::Main));

        dispatch(&mut shell, PetEvent::Menu(MenuAction::CloseMenus));
        assert!(!shell.menus.is_open(MenuKind::Main));
    }

    fn shell_in(dir: &Path) -> Shell {
        let config = Config::load_from(&dir.join("config.toml")).unwrap();
        Shell::new(config)
    }

    fn search_in(shell: &mut Shell, root: &Path, term: &str) {
        shell.config.search.roots = vec![root.to_string_lossy().to_string()];
        shell.start_search(term);
    }

    /// Wait until the current poller has seen its completion
    async fn settle(shell: &Shell) {
        let deadline = Instant::now() + Duration::from_secs(30);
        while shell.ticker.as_ref().is_some_and(|ticker| ticker.is_active()) {
            assert!(Instant::now() < deadline, "search never finished");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn result_names(shell: &Shell) -> Vec<String> {
        lock(&shell.results)
            .iter()
            .map(|result| result.display_name.clone())
            .collect()
    }

    #[test]
    fn yes_without_prompt_keeps_running() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell_in(dir.path());

        dispatch(&mut shell, PetEvent::Menu(MenuAction::ConfirmDismiss));
        assert!(shell.running);

        dispatch(&mut shell, PetEvent::Menu(MenuAction::CancelSearch));
        assert!(!lock(&shell.session).is_running());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn late_batch_of_replaced_search_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let old_root = dir.path().join("old");
        let new_root = dir.path().join("new");
        for i in 0..200 {
            touch(&old_root.join(format!("mario-old-{i}.exe")));
        }
        touch(&new_root.join("mario-new.exe"));

        let mut shell = shell_in(dir.path());
        search_in(&mut shell, &old_root, "mario");
        let first = lock(&shell.session).current_generation();
        search_in(&mut shell, &new_root, "mario");

        // A tick of the first poller arriving after the restart
        assert!(collect_batch(&shell.session, &shell.results, first).is_break());

        settle(&shell).await;
        assert_eq!(result_names(&shell), vec!["mario-new"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn restart_mid_search_lists_only_new_results() {
        let dir = tempfile::tempdir().unwrap();
        let old_root = dir.path().join("old");
        let new_root = dir.path().join("new");
        for i in 0..2000 {
            touch(&old_root.join(format!("mario-old-{i}.exe")));
        }
        touch(&new_root.join("mario-new.exe"));

        let mut shell = shell_in(dir.path());
        for round in 0..20u64 {
            search_in(&mut shell, &old_root, "mario");
            tokio::time::sleep(Duration::from_millis(5 + round % 12)).await;
            search_in(&mut shell, &new_root, "mario");

            settle(&shell).await;
            // Give a poller that was mid-tick during the restart time to finish
            tokio::time::sleep(Duration::from_millis(30)).await;
            assert_eq!(result_names(&shell), vec!["mario-new"], "round {round}");
        }
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }
}
