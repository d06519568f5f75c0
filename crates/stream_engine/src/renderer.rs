/// Page state after scripts ran, as reported by an external browser driver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedPage {
    pub markup: String,
    /// Attribute/property values the driver read from the live DOM.
    pub values: Vec<String>,
}

/// Capability to render a page in a real browser. Optional: `NoopRenderer`
/// only lowers recall, it never changes what static extraction finds.
#[async_trait::async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str) -> Option<RenderedPage>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRenderer;

#[async_trait::async_trait]
impl Renderer for NoopRenderer {
    async fn render(&self, _url: &str) -> Option<RenderedPage> {
        None
    }
}
