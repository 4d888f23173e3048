use std::sync::Arc;

use crate::{
    allocator::Allocator,
    core::{Config, Simulation},
    events::Bus,
    policies::{DriverPolicy, RandomPolicy},
    resources::ResourceVector,
    subscribers::Subscribe,
};

/// Builder for constructing a [`Simulation`].
pub struct SimulationBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    policy: Option<Arc<dyn DriverPolicy>>,
    hospitals: Option<Vec<(Arc<str>, ResourceVector)>>,
}

impl SimulationBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            policy: None,
            hospitals: None,
        }
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive every notification event, in order, through
    /// dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one more subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Replaces the default [`RandomPolicy`] used by every driver.
    pub fn with_policy(mut self, policy: Arc<dyn DriverPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Uses an explicit hospital list instead of `Config::hospitals` with
    /// randomly drawn maxima.
    pub fn with_hospitals<N>(
        mut self,
        hospitals: impl IntoIterator<Item = (N, ResourceVector)>,
    ) -> Self
    where
        N: Into<Arc<str>>,
    {
        self.hospitals = Some(
            hospitals
                .into_iter()
                .map(|(name, max)| (name.into(), max))
                .collect(),
        );
        self
    }

    /// Builds the simulation.
    ///
    /// Creates the bus and the allocator (which publishes the initial pool) and
    /// resolves the hospital list. Nothing is spawned until
    /// [`Simulation::run`].
    pub fn build(self) -> Arc<Simulation> {
        let (bus, stream) = Bus::channel();
        let allocator = Arc::new(Allocator::new(&self.cfg, bus.clone()));

        let policy = self.policy.unwrap_or_else(|| {
            Arc::new(RandomPolicy::from_config(&self.cfg)) as Arc<dyn DriverPolicy>
        });

        let hospitals = self.hospitals.unwrap_or_else(|| {
            let mut rng = rand::rng();
            self.cfg
                .hospital_names()
                .into_iter()
                .map(|name| (Arc::from(name), self.cfg.max_demand.sample(&mut rng)))
                .collect()
        });

        Arc::new(Simulation::new_internal(
            self.cfg,
            bus,
            stream,
            allocator,
            policy,
            hospitals,
            self.subscribers,
        ))
    }
}
