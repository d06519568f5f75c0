use std::sync::Arc;

use catalog_core::{parse_playlist, CandidateEntry, Catalog};
use chrono::Utc;
use stream_logging::{stream_error, stream_info, stream_warn};

use crate::batch::{BatchRunner, CandidateResolver};
use crate::embed::{EmbedInspector, EmbedResolver};
use crate::extract::CandidateExtractor;
use crate::obfuscation::ObfuscationDecoder;
use crate::fetch::{FetchHeaders, Fetcher, ReqwestFetcher};
use crate::renderer::{NoopRenderer, RenderedPage, Renderer};
use crate::resolve::StreamProbe;
use crate::{EngineContext, FailureKind, FetchError, RunOutcome};

/// Runs one discovery pass: fetch the root source, find candidates, check
/// them on the batch runner and assemble the catalog.
pub struct StreamEngine {
    ctx: EngineContext,
    root: Arc<dyn Fetcher>,
    embeds: Arc<dyn Fetcher>,
    renderer: Arc<dyn Renderer>,
    extractor: CandidateExtractor,
}

impl StreamEngine {
    pub fn new(ctx: EngineContext) -> Self {
        Self {
            root: Arc::new(ReqwestFetcher::for_root(&ctx)),
            embeds: Arc::new(ReqwestFetcher::for_embeds(&ctx)),
            renderer: Arc::new(NoopRenderer),
            extractor: CandidateExtractor::new(&ctx.config.extractor),
            ctx,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_extractor(mut self, extractor: CandidateExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    pub async fn run_playlist(&self, url: &str) -> RunOutcome {
        stream_info!("Starting playlist scrape of {}", url);
        match self.root.fetch_text(url, &FetchHeaders::default()).await {
            Ok(page) => self.catalog_from_playlist(&page.text).await,
            Err(err) => failed(err),
        }
    }

    pub async fn catalog_from_playlist(&self, content: &str) -> RunOutcome {
        let candidates = parse_playlist(content);
        if candidates.is_empty() {
            stream_error!("No channels found in playlist");
            return failed(FetchError::new(FailureKind::ExtractionEmpty, "playlist has no channels"));
        }
        let probe = Arc::new(StreamProbe::new(&self.ctx));
        self.check(candidates, probe).await
    }

    pub async fn run_page(&self, url: &str) -> RunOutcome {
        stream_info!("Starting page scrape of {}", url);
        let page = match self.root.fetch_text(url, &FetchHeaders::default()).await {
            Ok(page) => page,
            Err(err) => return failed(err),
        };
        if page.lossy {
            stream_warn!("Page {} decoded lossily as {}", url, page.encoding_label);
        }
        let rendered = self.renderer.render(url).await;
        self.page_catalog(&page.text, url, rendered.as_ref()).await
    }

    pub async fn catalog_from_page(&self, markup: &str, page_url: &str) -> RunOutcome {
        self.page_catalog(markup, page_url, None).await
    }

    async fn page_catalog(&self, markup: &str, page_url: &str, rendered: Option<&RenderedPage>) -> RunOutcome {
        let candidates = self.extractor.extract(markup, Some(page_url), rendered);
        if candidates.is_empty() {
            stream_warn!("No candidates or titles found on {}", page_url);
            return failed(FetchError::new(FailureKind::ExtractionEmpty, "no candidates found"));
        }
        let decoder = ObfuscationDecoder::for_array(self.ctx.config.obfuscated_array.as_deref());
        let inspector = EmbedInspector::new(self.embeds.clone())
            .with_decoder(decoder)
            .with_renderer(self.renderer.clone());
        let resolver = Arc::new(EmbedResolver::new(&self.ctx, inspector, page_url));
        self.check(candidates, resolver).await
    }

    async fn check(&self, candidates: Vec<CandidateEntry>, resolver: Arc<dyn CandidateResolver>) -> RunOutcome {
        let entries = BatchRunner::new(self.ctx.clone()).run(candidates, resolver).await;
        let catalog = Catalog::assemble(entries, Utc::now());
        stream_info!(
            "Scrape completed: {}/{} working",
            catalog.working(),
            catalog.total()
        );
        RunOutcome {
            catalog,
            failure: None,
        }
    }
}

fn failed(err: FetchError) -> RunOutcome {
    stream_error!("Scrape failed: {}", err);
    RunOutcome {
        catalog: Catalog::empty(Utc::now()),
        failure: Some(err),
    }
}
