use crate::{
    error::Result,
    models::{
        notification::{Notification, NotificationView, UnreadNotifications},
        response::ListEnvelope,
    },
    services::api::ApiClient,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSource: Send + Sync {
    async fn unread(&self) -> Result<UnreadNotifications>;
    async fn mark_read(&self, id: i64) -> Result<()>;
    async fn mark_all_read(&self) -> Result<()>;
}

#[derive(Clone)]
pub struct NotificationService {
    api: Arc<ApiClient>,
}

impl NotificationService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn listar(&self) -> Result<Vec<Notification>> {
        let envelope: ListEnvelope<Notification> = self
            .api
            .send(self.api.get("/consultas/notificaciones/"))
            .await?;
        Ok(envelope.into_vec())
    }

    pub async fn no_leidas(&self) -> Result<UnreadNotifications> {
        self.api
            .send(self.api.get("/consultas/notificaciones/no_leidas/"))
            .await
    }

    pub async fn marcar_leida(&self, id: i64) -> Result<()> {
        self.api
            .send_unit(
                self.api
                    .post(&format!("/consultas/notificaciones/{}/marcar_leida/", id)),
            )
            .await
    }

    pub async fn marcar_todas_leidas(&self) -> Result<()> {
        self.api
            .send_unit(self.api.post("/consultas/notificaciones/marcar_todas_leidas/"))
            .await
    }
}

#[async_trait]
impl NotificationSource for NotificationService {
    async fn unread(&self) -> Result<UnreadNotifications> {
        self.no_leidas().await
    }

    async fn mark_read(&self, id: i64) -> Result<()> {
        self.marcar_leida(id).await
    }

    async fn mark_all_read(&self) -> Result<()> {
        self.marcar_todas_leidas().await
    }
}

/// 最近一次服务端快照，加上此后用户在本地标记为已读的 id
#[derive(Default)]
struct Snapshot {
    items: Vec<Notification>,
    count: u32,
    overlay: BTreeSet<i64>,
    all_read: bool,
    seen: HashSet<i64>,
    initialized: bool,
}

impl Snapshot {
    fn contains(&self, id: i64) -> bool {
        self.items.iter().any(|n| n.id == id)
    }

    fn view(&self) -> NotificationView {
        if self.all_read {
            return NotificationView::default();
        }

        NotificationView {
            items: self
                .items
                .iter()
                .filter(|n| !self.overlay.contains(&n.id))
                .cloned()
                .collect(),
            unread_count: self.count.saturating_sub(self.overlay.len() as u32),
        }
    }

    /// 用新快照替换旧快照，返回首次出现的通知
    fn reconcile(&mut self, data: UnreadNotifications) -> Vec<Notification> {
        let arrivals = if self.initialized {
            data.notificaciones
                .iter()
                .filter(|n| !self.seen.contains(&n.id))
                .cloned()
                .collect()
        } else {
            Vec::new()
        };

        self.seen.extend(data.notificaciones.iter().map(|n| n.id));
        self.initialized = true;

        let ids: HashSet<i64> = data.notificaciones.iter().map(|n| n.id).collect();
        self.overlay.retain(|id| ids.contains(id));
        self.items = data.notificaciones;
        self.count = data.count;
        self.all_read = false;

        arrivals
    }
}

/// 通知中心：定时轮询未读通知，并在本地叠加用户的已读操作
#[derive(Clone)]
pub struct NotificationCenter {
    source: Arc<dyn NotificationSource>,
    interval: Duration,
    snapshot: Arc<Mutex<Snapshot>>,
    view: Arc<watch::Sender<NotificationView>>,
    arrivals: broadcast::Sender<Notification>,
}

impl NotificationCenter {
    pub fn new(source: Arc<dyn NotificationSource>, interval: Duration) -> Self {
        let (view, _) = watch::channel(NotificationView::default());
        let (arrivals, _) = broadcast::channel(32);

        Self {
            source,
            interval,
            snapshot: Arc::new(Mutex::new(Snapshot::default())),
            view: Arc::new(view),
            arrivals,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<NotificationView> {
        self.view.subscribe()
    }

    /// 新到达的通知（首次快照之后出现的 id）
    pub fn subscribe_arrivals(&self) -> broadcast::Receiver<Notification> {
        self.arrivals.subscribe()
    }

    pub fn view(&self) -> NotificationView {
        self.snapshot.lock().view()
    }

    pub fn unread(&self) -> Vec<Notification> {
        self.view().items
    }

    pub fn unread_count(&self) -> u32 {
        self.view().unread_count
    }

    fn publish(&self, snapshot: &Snapshot) {
        self.view.send_replace(snapshot.view());
    }

    /// 拉取一次服务端快照
    pub async fn refresh(&self) -> Result<Vec<Notification>> {
        let data = self.source.unread().await?;

        let mut snapshot = self.snapshot.lock();
        let arrivals = snapshot.reconcile(data);
        self.publish(&snapshot);

        if !arrivals.is_empty() {
            debug!("{} new notifications", arrivals.len());
        }
        Ok(arrivals)
    }

    /// 启动轮询：立即拉取一次，之后按固定间隔拉取
    pub fn mount(&self) -> PollerHandle {
        let center = self.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(center.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match center.refresh().await {
                    Ok(arrivals) => {
                        for notification in arrivals {
                            // 没有订阅者时丢弃
                            let _ = center.arrivals.send(notification);
                        }
                    }
                    Err(e) => warn!("Error fetching notifications: {}", e),
                }
            }
        });

        PollerHandle { task }
    }

    /// 标记单条已读；请求失败时列表保持不变
    pub async fn mark_read(&self, id: i64) -> Result<()> {
        self.source.mark_read(id).await?;

        let mut snapshot = self.snapshot.lock();
        if snapshot.contains(id) {
            snapshot.overlay.insert(id);
            self.publish(&snapshot);
        }
        Ok(())
    }

    pub async fn mark_all_read(&self) -> Result<()> {
        self.source.mark_all_read().await?;

        let mut snapshot = self.snapshot.lock();
        let ids: Vec<i64> = snapshot.items.iter().map(|n| n.id).collect();
        snapshot.overlay.extend(ids);
        snapshot.all_read = true;
        self.publish(&snapshot);
        Ok(())
    }
}

/// 轮询任务的句柄；drop 或 `unmount` 时终止轮询，在途响应随之丢弃
pub struct PollerHandle {
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// 停止轮询（终止任务由 `Drop` 完成）
    pub fn unmount(self) {
        drop(self);
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn notification(id: i64) -> Notification {
        Notification {
            id,
            titulo: format!("Aviso {}", id),
            mensaje: "Su consulta fue respondida".to_string(),
            url: Some(format!("/consultas/{}", id)),
            leida: false,
            tipo: None,
            created_at: None,
        }
    }

    fn unread(ids: &[i64]) -> UnreadNotifications {
        UnreadNotifications {
            notificaciones: ids.iter().copied().map(notification).collect(),
            count: ids.len() as u32,
        }
    }

    /// 按顺序返回预设快照；最后一个快照会被重复使用
    struct ScriptedSource {
        snapshots: Mutex<VecDeque<UnreadNotifications>>,
        polls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(snapshots: Vec<UnreadNotifications>) -> Arc<Self> {
            Arc::new(Self {
                snapshots: Mutex::new(snapshots.into()),
                polls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl NotificationSource for ScriptedSource {
        async fn unread(&self) -> Result<UnreadNotifications> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let mut snapshots = self.snapshots.lock();
            if snapshots.len() > 1 {
                Ok(snapshots.pop_front().unwrap_or_default())
            } else {
                Ok(snapshots.front().cloned().unwrap_or_default())
            }
        }

        async fn mark_read(&self, _id: i64) -> Result<()> {
            Ok(())
        }

        async fn mark_all_read(&self) -> Result<()> {
            Ok(())
        }
    }

    fn center(source: Arc<dyn NotificationSource>) -> NotificationCenter {
        NotificationCenter::new(source, Duration::from_secs(30))
    }

    #[tokio::test]
    async fn test_remarking_never_drops_counter_below_zero() {
        let center = center(ScriptedSource::new(vec![unread(&[1, 2])]));
        center.refresh().await.unwrap();

        center.mark_read(1).await.unwrap();
        assert_eq!(center.unread_count(), 1);

        center.mark_read(1).await.unwrap();
        center.mark_read(99).await.unwrap();
        assert_eq!(center.unread_count(), 1);

        center.mark_read(2).await.unwrap();
        center.mark_read(2).await.unwrap();
        assert_eq!(center.unread_count(), 0);
        assert!(center.unread().is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_drops_overlay_ids_missing_from_snapshot() {
        let center = center(ScriptedSource::new(vec![
            unread(&[1, 2]),
            unread(&[2, 3]),
        ]));
        center.refresh().await.unwrap();
        center.mark_read(1).await.unwrap();
        center.mark_read(2).await.unwrap();
        assert_eq!(center.unread_count(), 0);

        let arrivals = center.refresh().await.unwrap();

        // 2 仍在本地已读叠加层中
        assert_eq!(center.unread_count(), 1);
        assert_eq!(
            center.unread().iter().map(|n| n.id).collect::<Vec<_>>(),
            vec![3]
        );
        assert_eq!(arrivals.iter().map(|n| n.id).collect::<Vec<_>>(), vec![3]);
    }

    #[tokio::test]
    async fn test_first_snapshot_reports_no_arrivals() {
        let center = center(ScriptedSource::new(vec![unread(&[1, 2])]));
        assert!(center.refresh().await.unwrap().is_empty());
        assert!(center.refresh().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_mark_read_leaves_list_unchanged() {
        let mut source = MockNotificationSource::new();
        source.expect_unread().returning(|| Ok(unread(&[7])));
        source
            .expect_mark_read()
            .times(1)
            .returning(|_| Err(AppError::ExternalService("down".to_string())));
        let center = center(Arc::new(source));
        center.refresh().await.unwrap();

        assert!(center.mark_read(7).await.is_err());
        assert_eq!(center.unread_count(), 1);
        assert_eq!(center.unread()[0].id, 7);
    }

    #[tokio::test]
    async fn test_mark_all_read_clears_view_until_next_snapshot() {
        let center = center(ScriptedSource::new(vec![
            UnreadNotifications {
                notificaciones: vec![notification(1)],
                count: 5,
            },
            unread(&[4]),
        ]));
        center.refresh().await.unwrap();

        center.mark_all_read().await.unwrap();
        assert_eq!(center.view(), NotificationView::default());

        center.refresh().await.unwrap();
        assert_eq!(center.unread_count(), 1);
    }

    #[tokio::test]
    async fn test_subscribers_receive_updates() {
        let center = center(ScriptedSource::new(vec![unread(&[1, 2])]));
        let mut rx = center.subscribe();

        center.refresh().await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().unread_count, 2);

        center.mark_read(2).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().unread_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_fetches_immediately_then_periodically() {
        let source = ScriptedSource::new(vec![unread(&[1]), unread(&[1, 2])]);
        let center = center(source.clone());
        let mut arrivals = center.subscribe_arrivals();

        let handle = center.mount();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(source.polls.load(Ordering::SeqCst), 1);
        assert_eq!(center.unread_count(), 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.polls.load(Ordering::SeqCst), 2);
        assert_eq!(arrivals.recv().await.unwrap().id, 2);

        handle.unmount();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(source.polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_polling() {
        let source = ScriptedSource::new(vec![unread(&[1])]);
        let center = center(source.clone());

        {
            let handle = center.mount();
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert!(handle.is_running());
        }

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(source.polls.load(Ordering::SeqCst), 1);
    }
}
