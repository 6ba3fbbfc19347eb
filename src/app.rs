use std::{sync::Arc, time::Duration};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::widgets::ListState;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::service::{Hit, Item, SearchApi};

/// Completions delivered back to the event loop by spawned request tasks.
/// Each carries the id of the request that produced it so the loop can
/// discard responses that were superseded before they arrived.
pub(crate) enum Action {
    SearchFinished { request_id: u64, result: Result<Vec<Hit>> },
    ItemFinished { request_id: u64, result: Result<Item> },
}

/// Status of one request flow. The search flow and the detail flow each own
/// one of these, so a failure in one never clobbers the other's message.
#[derive(Debug, Default)]
pub(crate) struct RequestStatus {
    pub loading: bool,
    pub error: Option<String>,
}

impl RequestStatus {
    fn start(&mut self) {
        self.loading = true;
        self.error = None;
    }

    fn finish(&mut self) {
        self.loading = false;
    }

    fn fail(&mut self, err: &anyhow::Error) {
        self.loading = false;
        self.error = Some(format!("{:#}", err));
    }
}

pub(crate) struct App {
    pub running: bool,
    pub query: String,
    pub results: Vec<Hit>,
    pub list_state: ListState,
    pub selected_post: Option<Item>,
    pub search_status: RequestStatus,
    pub detail_status: RequestStatus,
    pub dark_mode: bool,
    api: Arc<dyn SearchApi>,
    next_request_id: u64,
    latest_search_id: Option<u64>,
    latest_item_id: Option<u64>,
    action_tx: UnboundedSender<Action>,
    action_rx: UnboundedReceiver<Action>,
}

impl App {
    pub(crate) fn new(api: Arc<dyn SearchApi>) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        return Self {
            running: true,
            query: String::new(),
            results: vec![],
            list_state: ListState::default(),
            selected_post: None,
            search_status: RequestStatus::default(),
            detail_status: RequestStatus::default(),
            dark_mode: false,
            api,
            next_request_id: 0,
            latest_search_id: None,
            latest_item_id: None,
            action_tx,
            action_rx,
        };
    }

    pub(crate) async fn run(&mut self, mut terminal: ratatui::DefaultTerminal) -> Result<()> {
        let mut tick = tokio::time::interval(Duration::from_millis(16));
        while self.running {
            terminal.draw(|frame| crate::ui::draw(frame, self))?;
            tokio::select! {
                _ = tick.tick() => {
                    // Drain everything already queued so pasted or fast-typed
                    // input is not spread over one keystroke per frame
                    while event::poll(Duration::from_millis(0))? {
                        if let Event::Key(key) = event::read()? {
                            if key.kind == KeyEventKind::Press {
                                self.handle_key(key);
                            }
                        }
                    }
                }
                Some(action) = self.action_rx.recv() => {
                    self.apply(action);
                }
            }
        }
        Ok(())
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => self.running = false,
                KeyCode::Char('u') => self.clear_query(),
                KeyCode::Char('t') => self.toggle_theme(),
                _ => {}
            }
            return;
        }
        match key.code {
            KeyCode::Esc => {
                if self.selected_post.is_some() {
                    self.selected_post = None;
                } else {
                    self.running = false;
                }
            }
            KeyCode::Up => self.select_prev(),
            KeyCode::Down => self.select_next(),
            KeyCode::Enter => self.open_selected(),
            KeyCode::Backspace => {
                if self.query.pop().is_some() {
                    self.submit_search();
                }
            }
            KeyCode::Char(c) => {
                self.query.push(c);
                self.submit_search();
            }
            _ => {}
        }
    }

    /// Issues a search for the current query. An empty query issues no
    /// request and leaves the previous results on screen.
    pub(crate) fn submit_search(&mut self) {
        if self.query.is_empty() {
            return;
        }
        let request_id = self.allocate_request_id();
        self.latest_search_id = Some(request_id);
        self.search_status.start();
        let api = Arc::clone(&self.api);
        let query = self.query.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let result = api.search(&query).await;
            let _ = tx.send(Action::SearchFinished { request_id, result });
        });
    }

    /// Fetches the detail of the result under the cursor. The previously
    /// selected post stays visible until the response replaces it.
    pub(crate) fn open_selected(&mut self) {
        let Some(index) = self.list_state.selected() else {
            return;
        };
        let Some(hit) = self.results.get(index) else {
            return;
        };
        let id = hit.id.clone();
        let request_id = self.allocate_request_id();
        self.latest_item_id = Some(request_id);
        self.detail_status.start();
        let api = Arc::clone(&self.api);
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let result = api.item(&id).await;
            let _ = tx.send(Action::ItemFinished { request_id, result });
        });
    }

    pub(crate) fn apply(&mut self, action: Action) {
        match action {
            Action::SearchFinished { request_id, result } => {
                if self.latest_search_id != Some(request_id) {
                    tracing::debug!(request_id, "discarding superseded search response");
                    return;
                }
                match result {
                    Ok(hits) => {
                        self.results = hits;
                        self.list_state
                            .select(if self.results.is_empty() { None } else { Some(0) });
                        self.search_status.finish();
                    }
                    Err(err) => {
                        tracing::warn!("search request failed: {:#}", err);
                        self.search_status.fail(&err);
                    }
                }
            }
            Action::ItemFinished { request_id, result } => {
                if self.latest_item_id != Some(request_id) {
                    tracing::debug!(request_id, "discarding superseded item response");
                    return;
                }
                match result {
                    Ok(item) => {
                        self.selected_post = Some(item);
                        self.detail_status.finish();
                    }
                    Err(err) => {
                        tracing::warn!("item request failed: {:#}", err);
                        self.detail_status.fail(&err);
                    }
                }
            }
        }
    }

    /// Empties the query without issuing a request; results stay displayed.
    pub(crate) fn clear_query(&mut self) {
        self.query.clear();
    }

    pub(crate) fn toggle_theme(&mut self) {
        self.dark_mode = !self.dark_mode;
    }

    fn select_prev(&mut self) {
        if self.results.is_empty() {
            return;
        }
        let prev = match self.list_state.selected() {
            Some(index) => index.saturating_sub(1),
            None => 0,
        };
        self.list_state.select(Some(prev));
    }

    fn select_next(&mut self) {
        if self.results.is_empty() {
            return;
        }
        let next = match self.list_state.selected() {
            Some(index) => std::cmp::min(index + 1, self.results.len() - 1),
            None => 0,
        };
        self.list_state.select(Some(next));
    }

    fn allocate_request_id(&mut self) -> u64 {
        self.next_request_id += 1;
        return self.next_request_id;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use anyhow::{bail, Context};
    use async_trait::async_trait;

    use super::*;
    use crate::service::Comment;

    struct StubApi {
        item: Option<Item>,
        fail: bool,
        fail_next: AtomicBool,
        search_calls: AtomicUsize,
        item_calls: AtomicUsize,
        item_ids: Mutex<Vec<String>>,
    }

    impl StubApi {
        fn new(item: Option<Item>) -> Arc<Self> {
            Arc::new(Self {
                item,
                fail: false,
                fail_next: AtomicBool::new(false),
                search_calls: AtomicUsize::new(0),
                item_calls: AtomicUsize::new(0),
                item_ids: Mutex::new(vec![]),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                item: None,
                fail: true,
                fail_next: AtomicBool::new(false),
                search_calls: AtomicUsize::new(0),
                item_calls: AtomicUsize::new(0),
                item_ids: Mutex::new(vec![]),
            })
        }

        fn failing_once() -> Arc<Self> {
            let stub = Self::new(None);
            stub.fail_next.store(true, Ordering::SeqCst);
            stub
        }

        fn should_fail(&self) -> bool {
            self.fail || self.fail_next.swap(false, Ordering::SeqCst)
        }
    }

    // Echoes the query back as the single hit title so tests can tell
    // which request produced a response.
    #[async_trait]
    impl SearchApi for StubApi {
        async fn search(&self, query: &str) -> Result<Vec<Hit>> {
            self.search_calls.fetch_add(1, Ordering::SeqCst);
            if self.should_fail() {
                bail!("request failed: 500 Internal Server Error");
            }
            Ok(vec![Hit { id: "1".to_string(), title: Some(query.to_string()) }])
        }

        async fn item(&self, id: &str) -> Result<Item> {
            self.item_calls.fetch_add(1, Ordering::SeqCst);
            self.item_ids.lock().unwrap().push(id.to_string());
            if self.should_fail() {
                bail!("request failed: 500 Internal Server Error");
            }
            self.item.clone().context("no item configured")
        }
    }

    async fn apply_next(app: &mut App) {
        let action = app.action_rx.recv().await.expect("completion action");
        app.apply(action);
    }

    fn rust_item() -> Item {
        Item {
            title: Some("Rust 1.0".to_string()),
            points: Some(42),
            children: vec![Comment { id: 101, text: Some("nice".to_string()) }],
        }
    }

    #[tokio::test]
    async fn search_then_open_selected_post() {
        let api = StubApi::new(Some(rust_item()));
        let mut app = App::new(api.clone());
        app.query = "rust".to_string();
        app.submit_search();
        assert!(app.search_status.loading);
        apply_next(&mut app).await;
        assert_eq!(app.results.len(), 1);
        assert_eq!(app.results[0].id, "1");
        assert_eq!(app.results[0].title.as_deref(), Some("rust"));
        assert!(!app.search_status.loading);
        assert_eq!(app.list_state.selected(), Some(0));

        app.open_selected();
        assert!(app.detail_status.loading);
        apply_next(&mut app).await;
        assert_eq!(api.item_calls.load(Ordering::SeqCst), 1);
        assert_eq!(*api.item_ids.lock().unwrap(), vec!["1".to_string()]);
        let post = app.selected_post.expect("selected post");
        assert_eq!(post.title.as_deref(), Some("Rust 1.0"));
        assert_eq!(post.points, Some(42));
        assert_eq!(post.children.len(), 1);
        assert_eq!(post.children[0].text.as_deref(), Some("nice"));
        assert!(!app.detail_status.loading);
    }

    #[tokio::test]
    async fn empty_query_issues_no_request() {
        let api = StubApi::new(None);
        let mut app = App::new(api.clone());
        app.submit_search();
        assert_eq!(api.search_calls.load(Ordering::SeqCst), 0);
        assert!(!app.search_status.loading);
    }

    #[tokio::test]
    async fn clearing_query_keeps_previous_results() {
        let api = StubApi::new(None);
        let mut app = App::new(api.clone());
        app.query = "rust".to_string();
        app.submit_search();
        apply_next(&mut app).await;
        app.clear_query();
        assert_eq!(app.query, "");
        assert_eq!(app.results.len(), 1);
        assert_eq!(api.search_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_search_keeps_results_and_reports_error() {
        let api = StubApi::failing();
        let mut app = App::new(api);
        app.results = vec![Hit { id: "7".to_string(), title: Some("kept".to_string()) }];
        app.query = "rust".to_string();
        app.submit_search();
        apply_next(&mut app).await;
        assert_eq!(app.results[0].title.as_deref(), Some("kept"));
        let error = app.search_status.error.expect("error message");
        assert!(!error.is_empty());
        assert!(!app.search_status.loading);
    }

    #[tokio::test]
    async fn new_search_clears_previous_error() {
        let api = StubApi::failing_once();
        let mut app = App::new(api.clone());
        app.query = "rust".to_string();
        app.submit_search();
        apply_next(&mut app).await;
        assert!(app.search_status.error.is_some());

        // Starting the next request clears the stale error right away
        app.submit_search();
        assert!(app.search_status.loading);
        assert!(app.search_status.error.is_none());
        apply_next(&mut app).await;
        assert_eq!(app.results[0].title.as_deref(), Some("rust"));
        assert!(app.search_status.error.is_none());
        assert!(!app.search_status.loading);
    }

    #[tokio::test]
    async fn superseded_search_response_is_discarded() {
        let api = StubApi::new(None);
        let mut app = App::new(api.clone());
        app.query = "a".to_string();
        app.submit_search();
        app.query = "ab".to_string();
        app.submit_search();
        apply_next(&mut app).await;
        apply_next(&mut app).await;
        assert_eq!(api.search_calls.load(Ordering::SeqCst), 2);
        assert_eq!(app.results.len(), 1);
        assert_eq!(app.results[0].title.as_deref(), Some("ab"));
    }

    #[tokio::test]
    async fn detail_failure_does_not_clobber_search_status() {
        let api = StubApi::failing();
        let mut app = App::new(api);
        app.results = vec![Hit { id: "1".to_string(), title: Some("Rust 1.0".to_string()) }];
        app.list_state.select(Some(0));
        app.open_selected();
        apply_next(&mut app).await;
        assert!(app.detail_status.error.is_some());
        assert!(app.search_status.error.is_none());
        assert!(!app.detail_status.loading);
    }

    #[tokio::test]
    async fn stale_post_stays_visible_while_detail_loads() {
        let api = StubApi::new(Some(rust_item()));
        let mut app = App::new(api);
        app.selected_post = Some(Item { title: Some("old".to_string()), points: None, children: vec![] });
        app.results = vec![Hit { id: "1".to_string(), title: Some("Rust 1.0".to_string()) }];
        app.list_state.select(Some(0));
        app.open_selected();
        assert!(app.detail_status.loading);
        assert_eq!(app.selected_post.as_ref().and_then(|p| p.title.as_deref()), Some("old"));
        apply_next(&mut app).await;
        assert_eq!(app.selected_post.as_ref().and_then(|p| p.title.as_deref()), Some("Rust 1.0"));
    }

    #[tokio::test]
    async fn toggling_theme_twice_restores_state() {
        let api = StubApi::new(None);
        let mut app = App::new(api.clone());
        app.query = "rust".to_string();
        app.submit_search();
        apply_next(&mut app).await;
        let results_before = app.results.clone();
        assert!(!app.dark_mode);
        app.toggle_theme();
        assert!(app.dark_mode);
        app.toggle_theme();
        assert!(!app.dark_mode);
        assert_eq!(app.query, "rust");
        assert_eq!(app.results, results_before);
        assert_eq!(api.search_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn typing_edits_query_and_searches() {
        let api = StubApi::new(None);
        let mut app = App::new(api.clone());
        for c in ['h', 'n'] {
            app.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
        assert_eq!(app.query, "hn");
        apply_next(&mut app).await;
        apply_next(&mut app).await;
        assert_eq!(api.search_calls.load(Ordering::SeqCst), 2);
        assert_eq!(app.results[0].title.as_deref(), Some("hn"));

        app.handle_key(KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE));
        assert_eq!(app.query, "h");
        apply_next(&mut app).await;
        // Deleting the last character leaves an empty query and issues nothing
        app.handle_key(KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE));
        assert_eq!(app.query, "");
        assert_eq!(api.search_calls.load(Ordering::SeqCst), 3);
    }
}
