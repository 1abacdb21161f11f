//! Assistant Assembly
//!
//! Builds the four-agent roster (debugger, user proxy, retrieval proxy,
//! generic entry point) with its capability grants, and wraps it in a
//! [`FacadeAgent`]. A fresh roster is built for every request, so the
//! retrieval agent's sticky context lives exactly as long as one session.

use std::sync::Arc;

use agent_core::{
    AgentConfig, AgentRoster, FacadeAgent, GenerationOptions, GroupChat, GroupChatConfig, GroupFactory,
    LlmAgent, LlmProvider, LlmSpeakerSelector, ProxyExecutor, Result as CoreResult, ToolRegistry,
};

use crate::config::AssistantConfig;
use crate::knowledge::Retriever;
use crate::prompts;
use crate::retrieval::RetrievalAgent;
use crate::tools::{
    CREATE_NOTEBOOK, CreateNotebookTool, GENERATE_FILES, GenerateFilesTool, READ_FILE, READ_NOTEBOOK,
    ReadFileTool, ReadNotebookTool, RETRIEVE_CONTENT, RetrieveContentTool, Workspace,
};

/// Factory for pyglotaran assistant sessions
pub struct AssistantGroup {
    provider: Arc<dyn LlmProvider>,
    retriever: Arc<dyn Retriever>,
    workspace: Workspace,
    options: GenerationOptions,
    max_round: usize,
}

impl AssistantGroup {
    pub fn new(provider: Arc<dyn LlmProvider>, retriever: Arc<dyn Retriever>, config: &AssistantConfig) -> Self {
        Self {
            provider,
            retriever,
            workspace: Workspace::new(&config.workspace_dir),
            options: GenerationOptions::default(),
            max_round: config.max_round,
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    fn persona(&self, name: &str, description: &str, system_prompt: &str) -> Arc<LlmAgent> {
        let mut config = AgentConfig::new(name, system_prompt);
        config.description = description.into();
        config.generation = self.options.clone();
        Arc::new(LlmAgent::new(self.provider.clone(), config))
    }

    /// Roster for one session
    pub fn roster(&self) -> CoreResult<AgentRoster> {
        let retrieval = Arc::new(RetrievalAgent::new(self.retriever.clone()));

        let mut tools = ToolRegistry::new();
        tools.register(ReadFileTool::new(self.workspace.clone()));
        tools.register(ReadNotebookTool::new(self.workspace.clone()));
        tools.register(GenerateFilesTool::new(self.workspace.clone()));
        tools.register(CreateNotebookTool::new(self.workspace.clone()));
        tools.register(RetrieveContentTool::new(retrieval.clone()));

        let executor = Arc::new(ProxyExecutor::new(
            prompts::USER_PROXY_NAME,
            prompts::USER_PROXY_DESCRIPTION,
            Arc::new(tools),
        ));

        let debugger = self.persona(prompts::DEBUGGER_NAME, prompts::DEBUGGER_DESCRIPTION, prompts::DEBUGGER_PERSONA);
        let generic = self.persona(prompts::GENERIC_NAME, prompts::GENERIC_DESCRIPTION, prompts::GENERIC_PERSONA);

        let proxy = prompts::USER_PROXY_NAME;
        AgentRoster::builder()
            .specialist(debugger)
            .executor(executor)
            .retrieval(retrieval)
            .entry_point(generic)
            .grant(prompts::DEBUGGER_NAME, proxy, READ_FILE)
            .grant(prompts::DEBUGGER_NAME, proxy, READ_NOTEBOOK)
            .grant(prompts::GENERIC_NAME, proxy, GENERATE_FILES)
            .grant(prompts::GENERIC_NAME, proxy, CREATE_NOTEBOOK)
            .grant(prompts::GENERIC_NAME, proxy, RETRIEVE_CONTENT)
            .build()
    }

    /// Wrap the group in a facade answering as the assistant
    pub fn into_facade(self) -> FacadeAgent {
        let provider = self.provider.clone();
        let options = self.options.clone();
        FacadeAgent::new(prompts::ASSISTANT_NAME, Arc::new(self), provider, options)
    }
}

impl GroupFactory for AssistantGroup {
    fn build(&self) -> CoreResult<GroupChat> {
        let roster = self.roster()?;
        let selector = LlmSpeakerSelector::new(self.provider.clone(), self.options.clone());
        Ok(GroupChat::new(
            Arc::new(roster),
            Arc::new(selector),
            GroupChatConfig { max_round: self.max_round, ..Default::default() },
        ))
    }
}
