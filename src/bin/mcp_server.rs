//! Type Quiz MCP Server
//!
//! A Model Context Protocol server over stdio exposing quiz sessions and
//! matchup lookups as tools. Every tool answers with the JSON form of the
//! corresponding `QuizService` response.

use std::borrow::Cow;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ErrorData as McpError, *},
    schemars, tool, tool_handler, tool_router, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use tokio::io::{stdin, stdout};
use type_quiz::quiz_interface::{
    CreateSessionRequest, MatchupRequest, SessionRequest, SubmitAnswerRequest,
};
use type_quiz::{telemetry, QuizConfig, QuizError, QuizService};

#[derive(Clone)]
pub struct TypeQuizMcpService {
    tool_router: ToolRouter<TypeQuizMcpService>,
    quiz: QuizService,
}

// Tool request structures
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateSessionParams {
    #[schemars(description = "Difficulty: 'easy', 'normal' or 'hard'")]
    pub difficulty: String,
    #[schemars(description = "Number of questions (1-100)")]
    pub question_count: usize,
    #[schemars(description = "Only draw from these types, e.g. ['fire', 'water']")]
    pub focus_types: Option<Vec<String>>,
    #[schemars(description = "Never draw these types")]
    pub exclude_types: Option<Vec<String>>,
    #[schemars(description = "Seed for a reproducible quiz")]
    pub seed: Option<u64>,
    #[schemars(description = "Minimum number of distinct effectiveness levels across the quiz")]
    pub min_effectiveness_variety: Option<usize>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SessionParams {
    #[schemars(description = "Session id returned by create_session")]
    pub session_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SubmitAnswerParams {
    #[schemars(description = "Session id returned by create_session")]
    pub session_id: String,
    #[schemars(description = "One of: none, quarter, half, normal, super, ultra")]
    pub answer: String,
    #[schemars(description = "Milliseconds spent on the question")]
    pub time_spent_ms: Option<u64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LookupMatchupParams {
    #[schemars(description = "Attacking type, e.g. 'ice'")]
    pub attacking_type: String,
    #[schemars(description = "One or two defending types, e.g. ['dragon', 'ground']")]
    pub defending_types: Vec<String>,
}

fn quiz_error(e: QuizError) -> McpError {
    let code = match e {
        QuizError::Generation(_) => ErrorCode(-32603),
        QuizError::Validation(_) | QuizError::NotFound(_) | QuizError::State(_) => {
            ErrorCode(-32602)
        }
    };
    McpError {
        code,
        message: Cow::from(e.to_string()),
        data: None,
    }
}

fn json_result<T: Serialize>(result: Result<T, QuizError>) -> Result<CallToolResult, McpError> {
    let value = result.map_err(quiz_error)?;
    let text = serde_json::to_string_pretty(&value).map_err(|e| McpError {
        code: ErrorCode(-32603),
        message: Cow::from(format!("Error encoding response: {}", e)),
        data: None,
    })?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

#[tool_router]
impl TypeQuizMcpService {
    pub fn new(quiz: QuizService) -> Self {
        Self {
            tool_router: Self::tool_router(),
            quiz,
        }
    }

    #[tool(description = "Create a new type-matchup quiz session")]
    async fn create_session(
        &self,
        Parameters(params): Parameters<CreateSessionParams>,
    ) -> Result<CallToolResult, McpError> {
        let mut request = CreateSessionRequest::new(params.difficulty, params.question_count);
        request.focus_types = params.focus_types;
        request.exclude_types = params.exclude_types;
        request.seed = params.seed;
        request.min_effectiveness_variety = params.min_effectiveness_variety;
        json_result(self.quiz.create_session(request))
    }

    #[tool(description = "Start a created quiz and get the first question")]
    async fn start_game(
        &self,
        Parameters(params): Parameters<SessionParams>,
    ) -> Result<CallToolResult, McpError> {
        json_result(self.quiz.start_game(SessionRequest::new(params.session_id)))
    }

    #[tool(description = "Answer the current question")]
    async fn submit_answer(
        &self,
        Parameters(params): Parameters<SubmitAnswerParams>,
    ) -> Result<CallToolResult, McpError> {
        json_result(self.quiz.submit_answer(SubmitAnswerRequest {
            session_id: params.session_id,
            answer: params.answer,
            time_spent_ms: params.time_spent_ms,
        }))
    }

    #[tool(description = "Show the question awaiting an answer")]
    async fn get_current_question(
        &self,
        Parameters(params): Parameters<SessionParams>,
    ) -> Result<CallToolResult, McpError> {
        json_result(
            self.quiz
                .get_current_question(SessionRequest::new(params.session_id)),
        )
    }

    #[tool(description = "Get status, progress and timing of a quiz")]
    async fn get_game_status(
        &self,
        Parameters(params): Parameters<SessionParams>,
    ) -> Result<CallToolResult, McpError> {
        json_result(self.quiz.get_game_status(SessionRequest::new(params.session_id)))
    }

    #[tool(description = "End a quiz early and get the final results")]
    async fn end_game(
        &self,
        Parameters(params): Parameters<SessionParams>,
    ) -> Result<CallToolResult, McpError> {
        json_result(self.quiz.end_game(SessionRequest::new(params.session_id)))
    }

    #[tool(description = "Reset a quiz to its unstarted state, keeping its questions")]
    async fn reset_game(
        &self,
        Parameters(params): Parameters<SessionParams>,
    ) -> Result<CallToolResult, McpError> {
        json_result(self.quiz.reset_game(SessionRequest::new(params.session_id)))
    }

    #[tool(description = "Look up how effective an attacking type is against one or two defending types")]
    async fn lookup_matchup(
        &self,
        Parameters(params): Parameters<LookupMatchupParams>,
    ) -> Result<CallToolResult, McpError> {
        json_result(self.quiz.lookup_matchup(MatchupRequest {
            attacking_type: params.attacking_type,
            defending_types: params.defending_types,
        }))
    }
}

#[tool_handler]
impl ServerHandler for TypeQuizMcpService {}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_tracing();
    let config = QuizConfig::load()?;
    tracing::info!(?config, "type quiz MCP server starting");

    let quiz = QuizService::new(config);
    let sweeper = quiz.spawn_sweeper();

    let server = TypeQuizMcpService::new(quiz)
        .serve((stdin(), stdout()))
        .await?;
    let quit_reason = server.waiting().await?;

    sweeper.abort();
    tracing::info!(?quit_reason, "type quiz MCP server exiting");
    Ok(())
}
