use crate::{
    error::Result,
    models::search::{GroupedEntry, SearchGroup, SearchResult, SearchResultType},
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// 查询过短时显示的快捷搜索
pub const QUICK_ACTIONS: [&str; 3] = ["fondo rotativo", "licencia construcción", "DAFIM"];

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchSource: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotlightKey {
    ArrowDown,
    ArrowUp,
    Enter,
    Escape,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpotlightAction {
    /// 打开结果链接
    Navigate(String),
    /// 把查询交给聊天助手
    AskAssistant(String),
    Close,
}

/// 搜索浮层的只读快照
#[derive(Debug, Clone, PartialEq)]
pub struct SpotlightView {
    pub open: bool,
    pub query: String,
    pub loading: bool,
    pub results: Vec<SearchResult>,
    pub selected: usize,
    pub quick_actions: Vec<&'static str>,
    pub offers_assistant: bool,
}

struct SearchState {
    open: bool,
    query: String,
    results: Vec<SearchResult>,
    selected: usize,
    loading: bool,
    latest_seq: u64,
    pending: Option<JoinHandle<()>>,
    /// 最近一次结束（应用结果或无需请求）的序号
    settled: watch::Sender<u64>,
}

impl Default for SearchState {
    fn default() -> Self {
        let (settled, _) = watch::channel(0);
        Self {
            open: false,
            query: String::new(),
            results: Vec::new(),
            selected: 0,
            loading: false,
            latest_seq: 0,
            pending: None,
            settled,
        }
    }
}

impl SearchState {
    /// 只接受最新一次请求的响应，旧响应直接丢弃
    fn accept(&mut self, seq: u64, outcome: Result<Vec<SearchResult>>) -> bool {
        if seq != self.latest_seq {
            debug!("Discarding stale search response #{}", seq);
            return false;
        }

        self.loading = false;
        self.pending = None;
        self.selected = 0;
        self.results = match outcome {
            Ok(mut results) => {
                // 未知类型的结果不显示，也不参与键盘导航
                results.retain(|r| r.tipo != SearchResultType::Otro);
                results
            }
            Err(e) => {
                warn!("Search failed: {}", e);
                Vec::new()
            }
        };
        self.settled.send_replace(seq);
        true
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        self.loading = false;
    }

    fn reset(&mut self) {
        self.cancel_pending();
        self.latest_seq += 1;
        self.query.clear();
        self.results.clear();
        self.selected = 0;
        self.settled.send_replace(self.latest_seq);
    }
}

/// 全局搜索浮层：防抖查询、结果分组、键盘导航
#[derive(Clone)]
pub struct SpotlightSearch {
    source: Arc<dyn SearchSource>,
    debounce: Duration,
    min_length: usize,
    state: Arc<Mutex<SearchState>>,
}

impl SpotlightSearch {
    pub fn new(source: Arc<dyn SearchSource>, debounce: Duration, min_length: usize) -> Self {
        Self {
            source,
            debounce,
            min_length,
            state: Arc::new(Mutex::new(SearchState::default())),
        }
    }

    pub fn open(&self) {
        self.state.lock().open = true;
    }

    pub fn close(&self) {
        let mut state = self.state.lock();
        state.open = false;
        state.reset();
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    fn long_enough(&self, query: &str) -> bool {
        query.chars().count() >= self.min_length
    }

    /// 更新查询文本
    ///
    /// 每次输入都会使之前的请求失效；查询足够长时在防抖间隔后发出一次请求。
    pub fn set_query(&self, query: impl Into<String>) {
        let query = query.into();
        let mut state = self.state.lock();

        state.cancel_pending();
        state.latest_seq += 1;
        state.query = query.clone();

        if !self.long_enough(&query) {
            state.results.clear();
            state.selected = 0;
            let seq = state.latest_seq;
            state.settled.send_replace(seq);
            return;
        }

        let seq = state.latest_seq;
        let source = self.source.clone();
        let shared = self.state.clone();
        let debounce = self.debounce;

        state.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            {
                let mut state = shared.lock();
                if state.latest_seq != seq {
                    return;
                }
                state.loading = true;
            }

            debug!("Spotlight search #{} for {:?}", seq, query);
            let outcome = source.search(&query).await;
            shared.lock().accept(seq, outcome);
        }));
    }

    /// 等待当前查询结束：结果已应用、请求失败，或根本不需要请求
    pub async fn settled(&self) {
        let (target, mut settled) = {
            let state = self.state.lock();
            (state.latest_seq, state.settled.subscribe())
        };

        while *settled.borrow_and_update() < target {
            if settled.changed().await.is_err() {
                return;
            }
        }
    }

    pub fn apply_quick_action(&self, index: usize) -> bool {
        match QUICK_ACTIONS.get(index) {
            Some(query) => {
                self.set_query(*query);
                true
            }
            None => false,
        }
    }

    pub fn quick_actions(&self) -> Vec<&'static str> {
        let state = self.state.lock();
        if self.long_enough(&state.query) {
            Vec::new()
        } else {
            QUICK_ACTIONS.to_vec()
        }
    }

    pub fn selected_index(&self) -> usize {
        self.state.lock().selected
    }

    pub fn results(&self) -> Vec<SearchResult> {
        self.state.lock().results.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    pub fn view(&self) -> SpotlightView {
        let state = self.state.lock();
        let long_enough = self.long_enough(&state.query);
        SpotlightView {
            open: state.open,
            query: state.query.clone(),
            loading: state.loading,
            results: state.results.clone(),
            selected: state.selected,
            quick_actions: if long_enough {
                Vec::new()
            } else {
                QUICK_ACTIONS.to_vec()
            },
            offers_assistant: long_enough,
        }
    }

    /// 按固定顺序（文章、部门、术语）分组，跳过空组
    pub fn grouped(&self) -> Vec<SearchGroup> {
        let state = self.state.lock();
        group_results(&state.results)
    }

    pub fn handle_key(&self, key: SpotlightKey) -> Option<SpotlightAction> {
        let mut state = self.state.lock();
        let last = state.results.len();

        match key {
            SpotlightKey::ArrowDown => {
                state.selected = (state.selected + 1).min(last);
                None
            }
            SpotlightKey::ArrowUp => {
                state.selected = state.selected.saturating_sub(1);
                None
            }
            SpotlightKey::Enter => {
                let index = state.selected;
                self.activate(&mut state, index)
            }
            SpotlightKey::Escape => {
                state.open = false;
                state.reset();
                Some(SpotlightAction::Close)
            }
        }
    }

    /// 指针点击某一项，等同于在该项上按 Enter
    pub fn select(&self, index: usize) -> Option<SpotlightAction> {
        let mut state = self.state.lock();
        self.activate(&mut state, index)
    }

    fn activate(&self, state: &mut SearchState, index: usize) -> Option<SpotlightAction> {
        let action = if let Some(result) = state.results.get(index) {
            SpotlightAction::Navigate(result.url.clone())
        } else if index == state.results.len() && self.long_enough(&state.query) {
            SpotlightAction::AskAssistant(state.query.clone())
        } else {
            return None;
        };

        state.open = false;
        state.reset();
        Some(action)
    }
}

fn group_results(results: &[SearchResult]) -> Vec<SearchGroup> {
    SearchResultType::DISPLAY_ORDER
        .iter()
        .filter_map(|tipo| {
            let entries: Vec<GroupedEntry> = results
                .iter()
                .enumerate()
                .filter(|(_, r)| r.tipo == *tipo)
                .map(|(index, result)| GroupedEntry {
                    index,
                    result: result.clone(),
                })
                .collect();

            if entries.is_empty() {
                None
            } else {
                Some(SearchGroup {
                    tipo: *tipo,
                    entries,
                })
            }
        })
        .collect()
}
