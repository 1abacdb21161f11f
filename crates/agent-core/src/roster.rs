//! Agent Roster & Capability Wiring
//!
//! The fixed set of agents taking part in a group conversation and the
//! static table of which agent may request which tool. Every grant is a
//! `(caller, executor, tool)` triple; there is a single designated executor.
//! Nothing here changes after [`RosterBuilder::build`].

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::agent::{ChatAgent, ProxyExecutor};
use crate::error::{AgentError, Result};
use crate::router::TurnRouter;
use crate::tool::ToolSchema;

/// Role an agent plays in the roster
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentKind {
    /// Triage agent; starts the conversation and interprets tool results
    EntryPoint,
    /// Role-specialised persona (e.g. the debugger)
    Specialist,
    /// Runs tool calls for the others
    ProxyExecutor,
    /// Retrieval collaborator; only reachable through a tool
    Retrieval,
}

impl AgentKind {
    /// Whether the auto speaker selector may pick this agent
    pub fn is_selectable(self) -> bool {
        !matches!(self, AgentKind::Retrieval)
    }
}

/// A roster entry
#[derive(Clone)]
pub struct RosterMember {
    pub agent: Arc<dyn ChatAgent>,
    pub kind: AgentKind,
}

impl RosterMember {
    pub fn name(&self) -> &str {
        self.agent.name()
    }
}

/// One capability grant
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CapabilityGrant {
    pub caller: String,
    pub executor: String,
    pub tool: String,
}

/// Static roster built once per conversation session
pub struct AgentRoster {
    members: Vec<RosterMember>,
    grants: Vec<CapabilityGrant>,
    capabilities: HashMap<String, Vec<ToolSchema>>,
    entry_point: String,
    executor: Arc<ProxyExecutor>,
}

impl AgentRoster {
    pub fn builder() -> RosterBuilder {
        RosterBuilder::default()
    }

    /// Members in registration order
    pub fn members(&self) -> &[RosterMember] {
        &self.members
    }

    pub fn get(&self, name: &str) -> Option<&RosterMember> {
        self.members.iter().find(|m| m.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn executor(&self) -> &Arc<ProxyExecutor> {
        &self.executor
    }

    pub fn grants(&self) -> &[CapabilityGrant] {
        &self.grants
    }

    /// Tool schemas `agent` may request
    pub fn tools_for(&self, agent: &str) -> &[ToolSchema] {
        self.capabilities.get(agent).map_or(&[], Vec::as_slice)
    }

    /// Whether `caller` was granted `tool`
    pub fn is_permitted(&self, caller: &str, tool: &str) -> bool {
        self.grants.iter().any(|g| g.caller == caller && g.tool == tool)
    }

    /// Agents the auto selector may pick, excluding `previous`
    pub fn candidates(&self, previous: Option<&str>) -> Vec<&RosterMember> {
        self.members
            .iter()
            .filter(|m| m.kind.is_selectable() && Some(m.name()) != previous)
            .collect()
    }

    /// Router wired to this roster's entry point and executor
    pub fn router(&self) -> TurnRouter {
        TurnRouter::new(&self.entry_point, self.executor.name())
    }

    /// Introduction message listing every member
    pub fn introductions(&self) -> String {
        let mut intro = String::from(
            "Hello everyone. We have assembled a great team today to answer questions and solve tasks. In attendance are:\n\n",
        );
        for member in &self.members {
            intro.push_str(&format!(
                "{}: {}\n",
                member.name(),
                member.agent.description().trim()
            ));
        }
        intro
    }
}

/// Builder for [`AgentRoster`]
#[derive(Default)]
pub struct RosterBuilder {
    members: Vec<RosterMember>,
    executor: Option<Arc<ProxyExecutor>>,
    grants: Vec<CapabilityGrant>,
}

impl RosterBuilder {
    pub fn agent(mut self, agent: Arc<dyn ChatAgent>, kind: AgentKind) -> Self {
        self.members.push(RosterMember { agent, kind });
        self
    }

    pub fn entry_point(self, agent: Arc<dyn ChatAgent>) -> Self {
        self.agent(agent, AgentKind::EntryPoint)
    }

    pub fn specialist(self, agent: Arc<dyn ChatAgent>) -> Self {
        self.agent(agent, AgentKind::Specialist)
    }

    pub fn retrieval(self, agent: Arc<dyn ChatAgent>) -> Self {
        self.agent(agent, AgentKind::Retrieval)
    }

    pub fn executor(mut self, executor: Arc<ProxyExecutor>) -> Self {
        self.members.push(RosterMember {
            agent: executor.clone(),
            kind: AgentKind::ProxyExecutor,
        });
        self.executor = Some(executor);
        self
    }

    /// Allow `caller` to request `tool`, executed by `executor`
    pub fn grant(mut self, caller: &str, executor: &str, tool: &str) -> Self {
        self.grants.push(CapabilityGrant {
            caller: caller.into(),
            executor: executor.into(),
            tool: tool.into(),
        });
        self
    }

    pub fn build(self) -> Result<AgentRoster> {
        let executor = self
            .executor
            .ok_or_else(|| AgentError::Config("Roster needs a proxy executor".into()))?;

        let mut seen = BTreeSet::new();
        for member in &self.members {
            if !seen.insert(member.name().to_string()) {
                return Err(AgentError::Config(format!(
                    "Duplicate agent name: {}",
                    member.name()
                )));
            }
        }

        let entry_points: Vec<_> = self
            .members
            .iter()
            .filter(|m| m.kind == AgentKind::EntryPoint)
            .collect();
        let [entry] = entry_points.as_slice() else {
            return Err(AgentError::Config(format!(
                "Roster needs exactly one entry point, found {}",
                entry_points.len()
            )));
        };
        let entry_point = entry.name().to_string();

        let schemas: HashMap<String, ToolSchema> = executor
            .tools()
            .schemas()
            .into_iter()
            .map(|s| (s.name.clone(), s))
            .collect();

        let mut capabilities: HashMap<String, Vec<ToolSchema>> = HashMap::new();
        for grant in &self.grants {
            if !seen.contains(&grant.caller) {
                return Err(AgentError::UnknownAgent(grant.caller.clone()));
            }
            if grant.executor != executor.name() {
                return Err(AgentError::Config(format!(
                    "'{}' is not the designated executor",
                    grant.executor
                )));
            }
            let schema = schemas
                .get(&grant.tool)
                .ok_or_else(|| AgentError::ToolNotFound(grant.tool.clone()))?;
            capabilities
                .entry(grant.caller.clone())
                .or_default()
                .push(schema.clone());
        }

        Ok(AgentRoster {
            members: self.members,
            grants: self.grants,
            capabilities,
            entry_point,
            executor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;
    use crate::tool::{ParameterSchema, Tool, ToolCall, ToolRegistry, ToolResult};
    use crate::{AgentConfig, LlmAgent};
    use async_trait::async_trait;

    struct Noop(&'static str);

    #[async_trait]
    impl Tool for Noop {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: self.0.into(),
                description: "noop".into(),
                parameters: vec![ParameterSchema::optional("x", "string", "unused", None)],
                category: None,
                has_side_effects: false,
            }
        }

        async fn execute(&self, _call: &ToolCall) -> crate::Result<ToolResult> {
            Ok(ToolResult::success(self.0, "ok"))
        }
    }

    fn llm(name: &str) -> Arc<dyn ChatAgent> {
        Arc::new(LlmAgent::new(
            Arc::new(ScriptedProvider::new(Vec::<String>::new())),
            AgentConfig::new(name, "persona"),
        ))
    }

    fn proxy() -> Arc<ProxyExecutor> {
        let mut registry = ToolRegistry::new();
        registry.register(Noop("read_file"));
        registry.register(Noop("create_empty_notebook"));
        Arc::new(ProxyExecutor::new("user_proxy", "runs tools", Arc::new(registry)))
    }

    fn roster() -> AgentRoster {
        AgentRoster::builder()
            .specialist(llm("debugger_agent"))
            .executor(proxy())
            .retrieval(llm("retrieval_user_proxy"))
            .entry_point(llm("generic_agent"))
            .grant("debugger_agent", "user_proxy", "read_file")
            .grant("generic_agent", "user_proxy", "create_empty_notebook")
            .build()
            .unwrap()
    }

    #[test]
    fn test_capabilities_follow_grants() {
        let roster = roster();
        assert_eq!(roster.entry_point(), "generic_agent");
        assert!(roster.is_permitted("debugger_agent", "read_file"));
        assert!(!roster.is_permitted("debugger_agent", "create_empty_notebook"));
        assert_eq!(roster.tools_for("generic_agent")[0].name, "create_empty_notebook");
        assert!(roster.tools_for("user_proxy").is_empty());
    }

    #[test]
    fn test_candidates_skip_previous_and_retrieval() {
        let roster = roster();
        let names: Vec<_> = roster
            .candidates(Some("debugger_agent"))
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        assert_eq!(names, vec!["user_proxy", "generic_agent"]);
    }

    #[test]
    fn test_grant_to_foreign_executor_is_rejected() {
        let result = AgentRoster::builder()
            .entry_point(llm("generic_agent"))
            .executor(proxy())
            .grant("generic_agent", "someone_else", "read_file")
            .build();
        assert!(matches!(result, Err(AgentError::Config(_))));
    }

    #[test]
    fn test_unknown_tool_is_rejected() {
        let result = AgentRoster::builder()
            .entry_point(llm("generic_agent"))
            .executor(proxy())
            .grant("generic_agent", "user_proxy", "format_disk")
            .build();
        assert!(matches!(result, Err(AgentError::ToolNotFound(_))));
    }

    #[test]
    fn test_entry_point_is_required() {
        let result = AgentRoster::builder().executor(proxy()).build();
        assert!(matches!(result, Err(AgentError::Config(_))));
    }
}
