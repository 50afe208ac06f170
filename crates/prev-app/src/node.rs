//! Scene graph nodes and depth-first traversal.

use crate::context::{InitContext, RenderContext, UpdateContext};

/// A node of the scene graph.
///
/// Every hook has an empty default. The traversal functions below visit a
/// node before its children, except [`shutdown_tree`] which releases
/// children first.
pub trait SceneNode {
    /// Create resources. Called once before the first update.
    #[allow(unused_variables)]
    fn init(&mut self, ctx: &mut InitContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Advance node state by `ctx.dt` seconds.
    #[allow(unused_variables)]
    fn update(&mut self, ctx: &mut UpdateContext<'_>) {}

    /// Record draw commands into the open render pass.
    #[allow(unused_variables)]
    fn render(&mut self, ctx: &mut RenderContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Release resources. The GPU is idle when this is called.
    fn shutdown(&mut self) {}

    fn children_mut(&mut self) -> &mut [Box<dyn SceneNode>] {
        &mut []
    }
}

pub fn init_tree(node: &mut dyn SceneNode, ctx: &mut InitContext<'_>) -> anyhow::Result<()> {
    node.init(ctx)?;
    for child in node.children_mut() {
        init_tree(child.as_mut(), ctx)?;
    }
    Ok(())
}

pub fn update_tree(node: &mut dyn SceneNode, ctx: &mut UpdateContext<'_>) {
    node.update(ctx);
    for child in node.children_mut() {
        update_tree(child.as_mut(), ctx);
    }
}

pub fn render_tree(node: &mut dyn SceneNode, ctx: &mut RenderContext<'_>) -> anyhow::Result<()> {
    node.render(ctx)?;
    for child in node.children_mut() {
        render_tree(child.as_mut(), ctx)?;
    }
    Ok(())
}

pub fn shutdown_tree(node: &mut dyn SceneNode) {
    for child in node.children_mut().iter_mut().rev() {
        shutdown_tree(child.as_mut());
    }
    node.shutdown();
}

/// A node that only holds children.
#[derive(Default)]
pub struct GroupNode {
    children: Vec<Box<dyn SceneNode>>,
}

impl GroupNode {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_child(mut self, child: impl SceneNode + 'static) -> Self {
        self.add_child(child);
        self
    }

    pub fn add_child(&mut self, child: impl SceneNode + 'static) {
        self.children.push(Box::new(child));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl SceneNode for GroupNode {
    fn children_mut(&mut self) -> &mut [Box<dyn SceneNode>] {
        &mut self.children
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ash::vk;
    use parking_lot::Mutex;
    use prev_event::EventChannel;
    use prev_input::Inputs;

    use super::*;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Probe {
        name: &'static str,
        log: Log,
        children: Vec<Box<dyn SceneNode>>,
        fail_init: bool,
    }

    impl Probe {
        fn new(name: &'static str, log: &Log) -> Self {
            Self {
                name,
                log: log.clone(),
                children: Vec::new(),
                fail_init: false,
            }
        }

        fn child(mut self, child: Self) -> Self {
            self.children.push(Box::new(child));
            self
        }

        fn record(&self, hook: &str) {
            self.log.lock().push(format!("{hook}:{}", self.name));
        }
    }

    impl SceneNode for Probe {
        fn init(&mut self, _ctx: &mut InitContext<'_>) -> anyhow::Result<()> {
            self.record("init");
            if self.fail_init {
                anyhow::bail!("{} failed", self.name);
            }
            Ok(())
        }

        fn update(&mut self, ctx: &mut UpdateContext<'_>) {
            self.record("update");
            ctx.clear_color[0] += 1.0;
        }

        fn render(&mut self, ctx: &mut RenderContext<'_>) -> anyhow::Result<()> {
            self.record(&format!("render{}", ctx.frame_in_flight_index));
            Ok(())
        }

        fn shutdown(&mut self) {
            self.record("shutdown");
        }

        fn children_mut(&mut self) -> &mut [Box<dyn SceneNode>] {
            &mut self.children
        }
    }

    fn tree(log: &Log) -> Probe {
        Probe::new("root", log)
            .child(Probe::new("a", log).child(Probe::new("a1", log)))
            .child(Probe::new("b", log))
    }

    fn hooks(log: &Log, prefix: &str) -> Vec<String> {
        log.lock()
            .iter()
            .filter_map(|entry| entry.strip_prefix(prefix).map(str::to_string))
            .collect()
    }

    #[test]
    fn update_and_render_visit_parents_first() {
        let log = Log::default();
        let mut root = tree(&log);
        let channel = EventChannel::new();
        let inputs = Inputs::new(&channel);
        let mut clear = [0.0; 4];

        update_tree(
            &mut root,
            &mut UpdateContext {
                dt: 0.016,
                channel: &channel,
                inputs: &inputs,
                clear_color: &mut clear,
            },
        );
        render_tree(
            &mut root,
            &mut RenderContext::new(vk::CommandBuffer::null(), 2, vk::Extent2D::default(), None),
        )
        .unwrap();

        assert_eq!(hooks(&log, "update:"), ["root", "a", "a1", "b"]);
        assert_eq!(hooks(&log, "render2:"), ["root", "a", "a1", "b"]);
        assert_eq!(clear[0], 4.0);
    }

    #[test]
    fn shutdown_visits_children_first() {
        let log = Log::default();
        let mut root = tree(&log);
        shutdown_tree(&mut root);
        assert_eq!(hooks(&log, "shutdown:"), ["b", "a1", "a", "root"]);
    }

    #[test]
    fn init_stops_at_first_error() {
        let log = Log::default();
        let mut failing = Probe::new("a", &log);
        failing.fail_init = true;
        let mut root = Probe::new("root", &log)
            .child(failing)
            .child(Probe::new("b", &log));

        let channel = EventChannel::new();
        let err = init_tree(&mut root, &mut InitContext::new(&channel, 3, None)).unwrap_err();
        assert_eq!(err.to_string(), "a failed");
        assert_eq!(hooks(&log, "init:"), ["root", "a"]);
    }

    #[test]
    fn init_context_without_gpu_reports_error() {
        let channel = EventChannel::new();
        let ctx = InitContext::new(&channel, 2, None);
        assert!(ctx.gpu().is_err());
        assert_eq!(ctx.frames_in_flight, 2);
    }

    #[test]
    fn group_node_forwards_to_children() {
        let log = Log::default();
        let mut group = GroupNode::new()
            .with_child(Probe::new("x", &log))
            .with_child(Probe::new("y", &log));
        assert_eq!(group.len(), 2);

        let channel = EventChannel::new();
        init_tree(&mut group, &mut InitContext::new(&channel, 3, None)).unwrap();
        assert_eq!(hooks(&log, "init:"), ["x", "y"]);
    }
}
