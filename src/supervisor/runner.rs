//! Supervisor for orchestrating audit investigations.
//!
//! The supervisor owns the tools and the per-task shared context. A
//! [`ToolDriver`] decides which tool to call next; the supervisor executes
//! each call, persists its output and finally builds the [`AuditReport`].

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::tools::{
    parse_args, AnalyzeDataArgs, ExtractDataArgs, GenerateHypothesesArgs, LookupKnowledgeArgs,
    ReadFileArgs, SearchAllFilesArgs, SearchFileArgs, VerifyHypothesesArgs,
};
use super::{
    build_report, AuditReport, ContextKey, DriverStep, SharedContext, TaskState,
    TaskStateMachine, TaskStats, ToolDriver, ToolName,
};
use crate::agents::{AgentContext, AgentResult, HypothesisAgent, SpecialistAgent, VerifierAgent};
use crate::ai::{AiProvider, TranscriptEntry};
use crate::analysis::AnalysisTool;
use crate::config::InvestigatorConfig;
use crate::evidence::{
    DocumentRegistry, EvidenceExtractor, ExtractionKind, PatternExtractor, RetrievalService,
};
use crate::knowledge::KnowledgeSource;

/// Transaction id used when the caller supplies none.
pub const UNKNOWN_TRANSACTION_ID: &str = "UNKNOWN";

/// Error type for supervisor operations.
#[derive(thiserror::Error, Debug)]
pub enum SupervisorError {
    /// The driver could not produce a next step.
    #[error("Driver failed: {0}")]
    Driver(String),
    /// The task was cancelled.
    #[error("Task cancelled")]
    Cancelled,
}

/// Progress of a task, in occurrence order.
#[derive(Debug, Clone, PartialEq)]
pub enum SupervisorEvent {
    TaskStarted {
        run_id: Uuid,
        task: String,
        transaction_id: String,
    },
    ToolCall { name: String, args: Value },
    ToolResult { name: String, output: String },
    ModelMessage(String),
    ReportBuilt(Box<AuditReport>),
}

/// Orchestrates tool calls over shared evidence for one task at a time.
pub struct Supervisor {
    retrieval: RetrievalService,
    knowledge: Arc<dyn KnowledgeSource>,
    extractor: Box<dyn EvidenceExtractor>,
    analysis: AnalysisTool,
    hypothesis_agent: Box<dyn SpecialistAgent>,
    verifier_agent: Box<dyn SpecialistAgent>,
    context: SharedContext,
    state: TaskStateMachine,
    config: InvestigatorConfig,
    cancel: Option<CancellationToken>,
}

impl Supervisor {
    /// Create a supervisor over a registry that is no longer written to.
    #[must_use]
    pub fn new(
        registry: Arc<DocumentRegistry>,
        knowledge: Arc<dyn KnowledgeSource>,
        provider: Arc<dyn AiProvider>,
        config: InvestigatorConfig,
    ) -> Self {
        let memory_limit = config.supervisor.memory_limit;
        Self {
            retrieval: RetrievalService::new(registry)
                .with_preview_chars(config.retrieval.preview_chars),
            knowledge,
            extractor: Box::new(PatternExtractor::with_default_rules()),
            analysis: AnalysisTool::new(config.analysis),
            hypothesis_agent: Box::new(HypothesisAgent::new(Arc::clone(&provider), memory_limit)),
            verifier_agent: Box::new(VerifierAgent::new(provider, memory_limit)),
            context: SharedContext::new(config.supervisor.max_context_chars),
            state: TaskStateMachine::new(),
            config,
            cancel: None,
        }
    }

    /// Replace the evidence extractor.
    #[must_use]
    pub fn with_extractor(mut self, extractor: Box<dyn EvidenceExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Set a cancellation token checked between steps.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    #[must_use]
    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    #[must_use]
    pub fn state(&self) -> TaskState {
        self.state.state()
    }

    #[must_use]
    pub fn stats(&self) -> TaskStats {
        self.state.stats()
    }

    #[must_use]
    pub fn retrieval(&self) -> &RetrievalService {
        &self.retrieval
    }

    /// Execute one tool call and return its text result.
    ///
    /// Never fails: unknown tools, bad arguments and tool errors all come
    /// back as explanatory strings.
    pub async fn dispatch(&mut self, name: &str, args: &Value) -> String {
        let tool = match name.parse::<ToolName>() {
            Ok(tool) => tool,
            Err(message) => {
                tracing::debug!(tool = name, "Unknown tool requested");
                return message;
            }
        };
        self.state.record_tool_call();
        tracing::debug!(%tool, %args, "Dispatching tool");

        let result = match tool {
            ToolName::ListIndexedFiles => Ok(self.retrieval.render_file_list()),
            ToolName::SearchFile => parse_args(tool, args).map(|a| self.search_file(&a)),
            ToolName::SearchAllFiles => parse_args(tool, args).map(|a| self.search_all_files(&a)),
            ToolName::ReadFile => parse_args(tool, args).map(|a| self.read_file(&a)),
            ToolName::ExtractData => parse_args(tool, args).map(|a| self.extract_data(&a)),
            ToolName::AnalyzeData => parse_args(tool, args).map(|a: AnalyzeDataArgs| {
                self.analysis
                    .run(&a.data, &a.analysis_type, &a.parameters)
            }),
            ToolName::LookupKnowledge => parse_args(tool, args).map(|a| self.lookup_knowledge(&a)),
            ToolName::GenerateHypotheses => match parse_args(tool, args) {
                Ok(a) => Ok(self.generate_hypotheses(a).await),
                Err(e) => Err(e),
            },
            ToolName::VerifyHypotheses => match parse_args(tool, args) {
                Ok(a) => Ok(self.verify_hypotheses(a).await),
                Err(e) => Err(e),
            },
        };

        result.unwrap_or_else(|message| message)
    }

    fn search_file(&mut self, args: &SearchFileArgs) -> String {
        let k = args.k.unwrap_or(self.config.retrieval.default_k).max(1);
        let output = self.retrieval.render_search(&args.file_id, &args.query, k);
        if self.retrieval.registry().get(&args.file_id).is_some() {
            self.context.append_text(ContextKey::Evidence, &output);
        }
        output
    }

    fn search_all_files(&mut self, args: &SearchAllFilesArgs) -> String {
        let k = args
            .k_per_file
            .unwrap_or(self.config.retrieval.default_k)
            .max(1);
        let output = self.retrieval.render_search_all(&args.query, k);
        if !self.retrieval.registry().is_empty() {
            self.context.append_text(ContextKey::Evidence, &output);
        }
        output
    }

    fn read_file(&mut self, args: &ReadFileArgs) -> String {
        let found = self.retrieval.fetch_full(&args.file_id, args.chunk).is_ok();
        let output = self.retrieval.render_chunk(&args.file_id, args.chunk);
        if found {
            self.context.append_text(ContextKey::Documents, &output);
        }
        output
    }

    fn extract_data(&mut self, args: &ExtractDataArgs) -> String {
        let kind = match args.extraction_type.parse::<ExtractionKind>() {
            Ok(kind) => kind,
            Err(message) => return message,
        };

        let (label, data) = match self.retrieval.registry().get(args.source.trim()) {
            Some(doc) => (
                format!("file_id={}", doc.file_id()),
                self.extractor.extract(&doc.text(), kind),
            ),
            None => ("text".to_string(), self.extractor.extract(&args.source, kind)),
        };

        let output = format!("Extracted {kind} from {label}:\n{}", data.render());
        if !data.is_empty() {
            self.context
                .set(ContextKey::TransactionData, Value::String(output.clone()));
        }
        output
    }

    fn lookup_knowledge(&mut self, args: &LookupKnowledgeArgs) -> String {
        let output = self.knowledge.lookup(
            &args.category,
            &args.query,
            self.config.supervisor.knowledge_k,
        );
        self.context
            .set(ContextKey::DomainKnowledge, Value::String(output.clone()));
        output
    }

    /// Caller-supplied value first, then the shared context, then empty.
    fn param_or_context(&self, param: &str, key: ContextKey) -> Value {
        if param.trim().is_empty() {
            Value::String(self.context.text(key))
        } else {
            Value::String(param.to_string())
        }
    }

    async fn generate_hypotheses(&mut self, args: GenerateHypothesesArgs) -> String {
        let mut agent_context = AgentContext::new();
        agent_context.insert(
            "documents".to_string(),
            self.param_or_context(&args.documents, ContextKey::Documents),
        );
        agent_context.insert(
            "transaction_data".to_string(),
            self.param_or_context(&args.transaction_data, ContextKey::TransactionData),
        );

        let result = self.hypothesis_agent.run(&args.task, &agent_context).await;
        self.state.record_agent_invocation();

        let ids: Vec<String> = result
            .data
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|h| h.get("id").and_then(Value::as_str))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        self.context.set(ContextKey::Hypotheses, result.data.clone());
        self.context.set(
            ContextKey::HypothesisReasoning,
            Value::String(result.reasoning.clone()),
        );
        self.context
            .record_hypothesis_ids(ids.iter().map(String::as_str));

        log_agent_result(&result);
        result.to_json_string()
    }

    async fn verify_hypotheses(&mut self, args: VerifyHypothesesArgs) -> String {
        let hypotheses = if args.hypotheses.trim().is_empty() {
            self.context
                .get(ContextKey::Hypotheses)
                .cloned()
                .unwrap_or_else(|| Value::Array(Vec::new()))
        } else {
            serde_json::from_str(&args.hypotheses)
                .unwrap_or_else(|_| Value::String(args.hypotheses.clone()))
        };

        let mut agent_context = AgentContext::new();
        agent_context.insert("hypotheses".to_string(), hypotheses.clone());
        agent_context.insert(
            "evidence".to_string(),
            self.param_or_context(&args.evidence, ContextKey::Evidence),
        );
        agent_context.insert(
            "domain_knowledge".to_string(),
            self.param_or_context(&args.domain_knowledge, ContextKey::DomainKnowledge),
        );

        let result = self.verifier_agent.run(&args.task, &agent_context).await;
        self.state.record_agent_invocation();

        self.context
            .set(ContextKey::Verifications, result.data.clone());
        self.context.set(
            ContextKey::VerificationReasoning,
            Value::String(result.reasoning.clone()),
        );
        self.context.set(ContextKey::VerifiedHypotheses, hypotheses);

        log_agent_result(&result);
        result.to_json_string()
    }

    /// Run a task to completion and return its report.
    ///
    /// # Errors
    ///
    /// Returns `SupervisorError::Driver` if the driver fails.
    pub async fn run(
        &mut self,
        task: &str,
        transaction_id: &str,
        driver: &mut dyn ToolDriver,
    ) -> Result<AuditReport, SupervisorError> {
        self.execute(task, transaction_id, driver, None).await
    }

    /// Like [`run`](Self::run), also sending each event as it occurs.
    ///
    /// Events are dropped silently if the receiver has gone away.
    ///
    /// # Errors
    ///
    /// Returns `SupervisorError::Driver` if the driver fails.
    pub async fn run_with_events(
        &mut self,
        task: &str,
        transaction_id: &str,
        driver: &mut dyn ToolDriver,
        events: &UnboundedSender<SupervisorEvent>,
    ) -> Result<AuditReport, SupervisorError> {
        self.execute(task, transaction_id, driver, Some(events)).await
    }

    async fn execute(
        &mut self,
        task: &str,
        transaction_id: &str,
        driver: &mut dyn ToolDriver,
        events: Option<&UnboundedSender<SupervisorEvent>>,
    ) -> Result<AuditReport, SupervisorError> {
        let emit = |event: SupervisorEvent| {
            if let Some(tx) = events {
                let _ = tx.send(event);
            }
        };
        let transaction_id = if transaction_id.trim().is_empty() {
            UNKNOWN_TRANSACTION_ID
        } else {
            transaction_id.trim()
        };

        self.context.clear();
        self.state.reset();
        self.state.transition(TaskState::ContextCleared);
        let run_id = Uuid::new_v4();
        tracing::info!(%run_id, transaction_id, "Starting investigation");
        emit(SupervisorEvent::TaskStarted {
            run_id,
            task: task.to_string(),
            transaction_id: transaction_id.to_string(),
        });

        self.state.transition(TaskState::Investigating);
        let cancel = self.cancel.clone();
        let max_steps = self.config.supervisor.max_steps;
        let mut transcript: Vec<TranscriptEntry> = Vec::new();
        let mut steps = 0;

        let summary = loop {
            if cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
                tracing::info!(steps, "Task cancelled via token");
                break format!("Investigation cancelled after {steps} tool calls.");
            }
            if steps >= max_steps {
                tracing::warn!(max_steps, "Step limit reached");
                break format!("Investigation stopped after reaching the limit of {max_steps} tool calls.");
            }

            let step = match &cancel {
                Some(token) => tokio::select! {
                    biased;

                    () = token.cancelled() => Err(SupervisorError::Cancelled),
                    step = driver.next_step(task, &transcript) => step,
                },
                None => driver.next_step(task, &transcript).await,
            };

            match step {
                Ok(DriverStep::CallTool { name, args }) => {
                    emit(SupervisorEvent::ToolCall {
                        name: name.clone(),
                        args: args.clone(),
                    });
                    let output = self.dispatch(&name, &args).await;
                    emit(SupervisorEvent::ToolResult {
                        name: name.clone(),
                        output: output.clone(),
                    });
                    transcript.push(TranscriptEntry::ToolCall { name: name.clone(), args });
                    transcript.push(TranscriptEntry::ToolResult { name, output });
                    steps += 1;
                }
                Ok(DriverStep::Finish { summary }) => {
                    emit(SupervisorEvent::ModelMessage(summary.clone()));
                    break summary;
                }
                Err(SupervisorError::Cancelled) => {
                    tracing::info!(steps, "Task cancelled while waiting for the driver");
                    break format!("Investigation cancelled after {steps} tool calls.");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Driver failed");
                    return Err(e);
                }
            }
        };

        let report = build_report(transaction_id, &summary, &self.context);
        self.state.transition(TaskState::ReportBuilt);
        emit(SupervisorEvent::ReportBuilt(Box::new(report.clone())));
        Ok(report)
    }
}

fn log_agent_result(result: &AgentResult) {
    tracing::info!(
        agent = %result.agent_name,
        status = %result.status,
        confidence = result.confidence,
        "Agent finished"
    );
}
