use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

/// Long-running part of the hub: LED link, dashboard, broker link
#[async_trait]
pub trait Startable: Send + Sync {
    /// Short name used in logs ("mqtt", "light", ...)
    fn name(&self) -> &'static str;

    async fn start(&self) -> Result<()>;

    async fn stop(&self);

    /// False while required settings are missing. Such components are skipped.
    async fn can_start(&self) -> bool {
        true
    }
}

/// Implements [`Startable`] by forwarding to `start_internal` / `stop_internal`.
///
/// ```ignore
/// impl_startable!(LightController, "light");
/// impl_startable!(MqttAdapter, "mqtt", is_configured);
/// ```
#[macro_export]
macro_rules! impl_startable {
    ($component:ty, $name:literal $(, $can_start:ident)?) => {
        #[async_trait::async_trait]
        impl $crate::adapters::Startable for $component {
            fn name(&self) -> &'static str {
                $name
            }

            async fn start(&self) -> anyhow::Result<()> {
                self.start_internal().await
            }

            async fn stop(&self) {
                self.stop_internal().await
            }

            $(
                async fn can_start(&self) -> bool {
                    self.$can_start().await
                }
            )?
        }
    };
}

/// Running components, kept in start order.
///
/// The hub starts consumers before producers (LED link, dashboard, then the
/// broker) and tears them down the other way round.
#[derive(Default)]
pub struct StartOrder {
    running: Vec<Arc<dyn Startable>>,
}

impl StartOrder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `component` after the ones already running. A component that
    /// cannot start is skipped. If it fails, everything started so far is
    /// stopped again.
    pub async fn start(&mut self, component: Arc<dyn Startable>) -> Result<()> {
        if !component.can_start().await {
            tracing::warn!("{} cannot start (not configured?), skipping", component.name());
            return Ok(());
        }
        if let Err(e) = component.start().await {
            tracing::error!("Failed to start {}: {}", component.name(), e);
            self.stop_all().await;
            return Err(e);
        }
        tracing::info!("Started {}", component.name());
        self.running.push(component);
        Ok(())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.running.iter().map(|c| c.name()).collect()
    }

    /// Stop everything, most recently started first
    pub async fn stop_all(&mut self) {
        while let Some(component) = self.running.pop() {
            component.stop().await;
            tracing::debug!("Stopped {}", component.name());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::Mutex;

    type Journal = Arc<Mutex<Vec<String>>>;

    struct Component {
        name: &'static str,
        configured: bool,
        fails: bool,
        journal: Journal,
    }

    impl Component {
        fn new(name: &'static str, journal: &Journal) -> Arc<Self> {
            Arc::new(Self {
                name,
                configured: true,
                fails: false,
                journal: journal.clone(),
            })
        }

        async fn start_internal(&self) -> Result<()> {
            if self.fails {
                return Err(anyhow!("{} broke", self.name));
            }
            self.journal.lock().unwrap().push(format!("start {}", self.name));
            Ok(())
        }

        async fn stop_internal(&self) {
            self.journal.lock().unwrap().push(format!("stop {}", self.name));
        }

        async fn is_configured(&self) -> bool {
            self.configured
        }
    }

    crate::impl_startable!(Component, "component", is_configured);

    struct Plain;

    impl Plain {
        async fn start_internal(&self) -> Result<()> {
            Ok(())
        }

        async fn stop_internal(&self) {}
    }

    crate::impl_startable!(Plain, "plain");

    #[tokio::test]
    async fn test_macro_without_can_start_defaults_to_true() {
        assert!(Plain.can_start().await);
        assert_eq!(Plain.name(), "plain");
    }

    #[tokio::test]
    async fn test_stops_in_reverse_start_order() {
        let journal = Journal::default();
        let mut order = StartOrder::new();
        for name in ["light", "dashboard", "mqtt"] {
            order.start(Component::new(name, &journal)).await.unwrap();
        }
        order.stop_all().await;

        assert_eq!(
            *journal.lock().unwrap(),
            vec![
                "start light",
                "start dashboard",
                "start mqtt",
                "stop mqtt",
                "stop dashboard",
                "stop light",
            ]
        );
        assert!(order.names().is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_component_is_skipped() {
        let journal = Journal::default();
        let mut order = StartOrder::new();
        order.start(Component::new("light", &journal)).await.unwrap();
        order
            .start(Arc::new(Component {
                name: "mqtt",
                configured: false,
                fails: false,
                journal: journal.clone(),
            }))
            .await
            .unwrap();

        assert_eq!(order.names(), vec!["component"]);
        assert_eq!(*journal.lock().unwrap(), vec!["start light"]);
    }

    #[tokio::test]
    async fn test_failed_start_stops_running_components() {
        let journal = Journal::default();
        let mut order = StartOrder::new();
        order.start(Component::new("light", &journal)).await.unwrap();
        let result = order
            .start(Arc::new(Component {
                name: "dashboard",
                configured: true,
                fails: true,
                journal: journal.clone(),
            }))
            .await;

        assert!(result.is_err());
        assert_eq!(*journal.lock().unwrap(), vec!["start light", "stop light"]);
        assert!(order.names().is_empty());
    }
}
