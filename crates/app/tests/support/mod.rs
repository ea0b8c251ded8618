//! In-memory port fakes shared by the integration tests.

#![allow(dead_code, reason = "each test binary uses a subset of the fakes")]

use pilot_adapters::TestEmbedding;
use pilot_app::{
    Chunker, CompletionDeps, CompletionOrchestrator, CompletionSettings, IndexHandle, Indexer,
    IndexerDeps, IndexerSettings, Retriever,
};
use pilot_domain::{ChatMessage, ChunkBounds, IndexSnapshot, ModelName, Mtime};
use pilot_ports::{
    BoxFuture, ChunkStorePort, EmbedRequest, EmbeddingPort, FileContent, FileQuery,
    GenerateRequest, ModelServicePort, PathFilter, WorkspaceFilesPort,
};
use pilot_shared::{ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// `count` distinct lines that each pass the default chunk bounds.
pub fn source_lines(prefix: &str, count: usize) -> String {
    (0..count)
        .map(|line| format!("let {prefix}_{line} = compute_{prefix}({line});"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Workspace held in memory: path to (text, mtime).
#[derive(Default)]
pub struct MemoryFiles {
    files: Mutex<BTreeMap<Box<str>, (String, Mtime)>>,
    unreadable: Mutex<BTreeSet<Box<str>>>,
    reads: AtomicUsize,
}

impl MemoryFiles {
    pub fn put(&self, path: &str, text: impl Into<String>, mtime: Mtime) {
        lock(&self.files).insert(path.into(), (text.into(), mtime));
    }

    pub fn remove(&self, path: &str) {
        lock(&self.files).remove(path);
    }

    pub fn make_unreadable(&self, path: &str) {
        lock(&self.unreadable).insert(path.into());
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl WorkspaceFilesPort for MemoryFiles {
    fn enumerate(
        &self,
        ctx: &RequestContext,
        query: FileQuery,
    ) -> BoxFuture<'_, Result<Vec<Box<str>>>> {
        let cancelled = ctx.ensure_not_cancelled("memory_files.enumerate");
        let paths = PathFilter::new(&query).map(|filter| {
            lock(&self.files)
                .keys()
                .filter(|path| filter.accepts(path))
                .take(query.max_results)
                .cloned()
                .collect::<Vec<_>>()
        });
        Box::pin(async move {
            cancelled?;
            paths
        })
    }

    fn stat(&self, _ctx: &RequestContext, path: Box<str>) -> BoxFuture<'_, Result<Option<Mtime>>> {
        let mtime = lock(&self.files).get(&path).map(|(_, mtime)| *mtime);
        Box::pin(async move { Ok(mtime) })
    }

    fn read(&self, _ctx: &RequestContext, path: Box<str>) -> BoxFuture<'_, Result<FileContent>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let result = if lock(&self.unreadable).contains(&path) {
            Err(ErrorEnvelope::expected(ErrorCode::io(), format!("cannot read {path}")))
        } else {
            lock(&self.files)
                .get(&path)
                .map(|(text, mtime)| FileContent {
                    text: text.clone(),
                    mtime: *mtime,
                })
                .ok_or_else(|| ErrorEnvelope::expected(ErrorCode::not_found(), "missing"))
        };
        Box::pin(async move { result })
    }
}

/// Store that keeps the last saved snapshot.
#[derive(Default)]
pub struct MemoryStore {
    persisted: Mutex<IndexSnapshot>,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn with_snapshot(snapshot: IndexSnapshot) -> Self {
        Self {
            persisted: Mutex::new(snapshot),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn persisted(&self) -> IndexSnapshot {
        lock(&self.persisted).clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl ChunkStorePort for MemoryStore {
    fn load(&self, _ctx: &RequestContext) -> BoxFuture<'_, Result<IndexSnapshot>> {
        let snapshot = self.persisted();
        Box::pin(async move { Ok(snapshot) })
    }

    fn save(&self, _ctx: &RequestContext, snapshot: Arc<IndexSnapshot>) -> BoxFuture<'_, Result<()>> {
        *lock(&self.persisted) = (*snapshot).clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }

    fn describe(&self) -> Box<str> {
        "memory".into()
    }
}

/// Embedder that fails for texts containing a marker, delegating otherwise.
pub struct FlakyEmbedding {
    inner: TestEmbedding,
    marker: &'static str,
    error: ErrorEnvelope,
}

impl FlakyEmbedding {
    pub fn new(marker: &'static str, error: ErrorEnvelope) -> Result<Self> {
        Ok(Self {
            inner: TestEmbedding::new(64)?,
            marker,
            error,
        })
    }
}

impl EmbeddingPort for FlakyEmbedding {
    fn model(&self) -> &ModelName {
        self.inner.model()
    }

    fn embed(&self, ctx: &RequestContext, request: EmbedRequest) -> BoxFuture<'_, Result<Vec<f32>>> {
        if request.text.contains(self.marker) {
            let error = self.error.clone();
            return Box::pin(async move { Err(error) });
        }
        self.inner.embed(ctx, request)
    }
}

/// Model service replaying scripted completions and recording prompts.
#[derive(Default)]
pub struct ScriptedModel {
    completions: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
    chats: Mutex<Vec<Vec<ChatMessage>>>,
    fail_chat: Mutex<bool>,
    delay: Duration,
}

impl ScriptedModel {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn push_completion(&self, completion: Result<String>) {
        lock(&self.completions).push_back(completion);
    }

    pub fn set_chat_failure(&self, fail: bool) {
        *lock(&self.fail_chat) = fail;
    }

    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    pub fn chats(&self) -> Vec<Vec<ChatMessage>> {
        lock(&self.chats).clone()
    }
}

impl ModelServicePort for ScriptedModel {
    fn generate_completion(
        &self,
        ctx: &RequestContext,
        request: GenerateRequest,
    ) -> BoxFuture<'_, Result<String>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            lock(&self.prompts).push(request.prompt);
            tokio::select! {
                () = ctx.cancelled() => return Err(ErrorEnvelope::cancelled("generate aborted")),
                () = tokio::time::sleep(self.delay) => {},
            }
            lock(&self.completions)
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()))
        })
    }

    fn chat(
        &self,
        ctx: &RequestContext,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<ChatMessage>> {
        let cancelled = ctx.ensure_not_cancelled("scripted.chat");
        Box::pin(async move {
            cancelled?;
            let turn = {
                let mut chats = lock(&self.chats);
                chats.push(messages);
                chats.len()
            };
            if *lock(&self.fail_chat) {
                return Err(ErrorEnvelope::unexpected(
                    ErrorCode::dependency_unavailable(),
                    "chat backend down",
                    ErrorClass::Retriable,
                ));
            }
            Ok(ChatMessage::assistant(format!("reply {turn}")))
        })
    }

    fn load_model(&self, _ctx: &RequestContext, _model: ModelName) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn unload_model(&self, _ctx: &RequestContext, _model: ModelName) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}

fn all_files() -> FileQuery {
    FileQuery {
        include: vec!["**/*".into()],
        exclude: Vec::new(),
        max_results: 100,
    }
}

/// Indexer over in-memory fakes with the default chunker.
pub struct Fixture {
    pub files: Arc<MemoryFiles>,
    pub store: Arc<MemoryStore>,
    pub embedding: Arc<dyn EmbeddingPort>,
    pub indexer: Arc<Indexer>,
}

impl Fixture {
    pub fn new(embedding: Arc<dyn EmbeddingPort>) -> Result<Self> {
        Self::with_store(embedding, MemoryStore::default())
    }

    pub fn with_store(embedding: Arc<dyn EmbeddingPort>, store: MemoryStore) -> Result<Self> {
        Self::with_parts(embedding, store, all_files())
    }

    pub fn with_query(embedding: Arc<dyn EmbeddingPort>, query: FileQuery) -> Result<Self> {
        Self::with_parts(embedding, MemoryStore::default(), query)
    }

    pub fn with_parts(
        embedding: Arc<dyn EmbeddingPort>,
        store: MemoryStore,
        query: FileQuery,
    ) -> Result<Self> {
        let files = Arc::new(MemoryFiles::default());
        let store = Arc::new(store);
        let indexer = Arc::new(Indexer::new(
            IndexerDeps {
                files: Arc::clone(&files) as Arc<dyn WorkspaceFilesPort>,
                embedding: Arc::clone(&embedding),
                store: Arc::clone(&store) as Arc<dyn ChunkStorePort>,
                logger: None,
            },
            IndexerSettings {
                query,
                chunker: Chunker::new(50, ChunkBounds::default()).unwrap_or_default(),
            },
            IndexHandle::default(),
        )?);
        Ok(Self {
            files,
            store,
            embedding,
            indexer,
        })
    }

    pub fn retriever(&self) -> Retriever {
        Retriever::new(Arc::clone(&self.embedding), self.indexer.handle().clone())
    }

    pub fn orchestrator(&self, model: Arc<ScriptedModel>) -> CompletionOrchestrator {
        CompletionOrchestrator::new(
            CompletionDeps {
                model,
                retriever: Some(self.retriever()),
                logger: None,
            },
            CompletionSettings {
                system_message: "Only output code.".to_owned(),
                context_lines: 20,
                top_k: 2,
            },
        )
    }
}
