use crate::runtime::Runtime;
use crate::scene::{ContentKind, Node, NodeRef};

/// Renders one kind of ECS component (meshes, lines, icons, labels...).
pub trait RenderSystem: Send {
    fn name(&self) -> &str;

    /// Called from every viewer setup, so also after each viewer rebuild.
    fn initialize(&mut self, runtime: &mut Runtime);

    /// GPU-side update, once per frame after the ECS update.
    fn update(&mut self, runtime: &mut Runtime);
}

/// Simulation-side ECS system.
pub trait EcsSystem: Send {
    fn name(&self) -> &str;
    fn update(&mut self, time: f64);
}

/// Scene node connecting the ECS systems to the frame loop.
pub struct SystemsGroup {
    render: Vec<Box<dyn RenderSystem>>,
    ecs: Vec<Box<dyn EcsSystem>>,
    node: NodeRef,
}

impl std::fmt::Debug for SystemsGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemsGroup")
            .field("render", &self.render.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("ecs", &self.ecs.iter().map(|s| s.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl SystemsGroup {
    pub fn new() -> Self {
        Self {
            render: Vec::new(),
            ecs: Vec::new(),
            node: Node::content(ContentKind::Systems, 0),
        }
    }

    #[inline]
    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    pub fn add_render_system(&mut self, system: impl RenderSystem + 'static) {
        self.render.push(Box::new(system));
    }

    pub fn add_ecs_system(&mut self, system: impl EcsSystem + 'static) {
        self.ecs.push(Box::new(system));
    }

    pub fn len(&self) -> usize {
        self.render.len() + self.ecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn initialize(&mut self, runtime: &mut Runtime) {
        for s in &mut self.render {
            log::debug!("initializing render system {}", s.name());
            s.initialize(runtime);
        }
    }

    pub fn update(&mut self, time: f64) {
        for s in &mut self.ecs {
            s.update(time);
        }
    }

    pub fn update_gpu(&mut self, runtime: &mut Runtime) {
        for s in &mut self.render {
            s.update(runtime);
        }
    }
}

impl Default for SystemsGroup {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    struct Probe {
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl RenderSystem for Probe {
        fn name(&self) -> &str {
            "probe"
        }
        fn initialize(&mut self, runtime: &mut Runtime) {
            runtime.define("PROBE");
            self.calls.lock().unwrap().push("init".into());
        }
        fn update(&mut self, _runtime: &mut Runtime) {
            self.calls.lock().unwrap().push("gpu".into());
        }
    }

    impl EcsSystem for Probe {
        fn name(&self) -> &str {
            "probe"
        }
        fn update(&mut self, time: f64) {
            self.calls.lock().unwrap().push(format!("ecs {time}"));
        }
    }

    #[test]
    fn systems_run_in_their_phases() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut group = SystemsGroup::new();
        group.add_render_system(Probe { calls: Arc::clone(&calls) });
        group.add_ecs_system(Probe { calls: Arc::clone(&calls) });
        let mut rt = Runtime::new(3);

        group.initialize(&mut rt);
        group.update(1.5);
        group.update_gpu(&mut rt);

        assert_eq!(*calls.lock().unwrap(), vec!["init", "ecs 1.5", "gpu"]);
        assert!(rt.is_defined("PROBE"));
        assert_eq!(group.len(), 2);
    }
}
