//! Todo tools exposed over MCP.
//!
//! Tool input is decoded into [`TodoTool`] at the boundary, so handlers
//! only ever see well-formed arguments. Each handler performs exactly one
//! store operation and answers with three things:
//!
//! - a one-line status text with the current totals (`content`),
//! - a preview payload holding the first [`PREVIEW_LIMIT`] todos plus the
//!   operation's own fields (`structuredContent`),
//! - the full, unbounded data (`_meta`), for consumers that need more than
//!   the preview.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::mcp::resources::WIDGET_TEMPLATE_URI;
use crate::todo::{Snapshot, Todo, TodoList, TodoStats, TodoStore};

/// Number of todos included in the structured preview.
pub const PREVIEW_LIMIT: usize = 10;

/// A tool definition for tools/list response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Display title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
    /// Behaviour hints for the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Value>,
    /// Host-specific metadata (widget binding).
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Preview payload used to hydrate the widget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    /// Full data payload.
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    /// Whether the tool call resulted in an error.
    #[serde(skip_serializing_if = "is_false")]
    pub is_error: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires a predicate fn(&T) -> bool, so we must take &bool here
const fn is_false(b: &bool) -> bool {
    !*b
}

impl ToolCallResult {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            structured_content: None,
            meta: None,
            is_error: false,
        }
    }

    /// Creates an error text result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::text(message)
        }
    }

    /// Attaches the structured preview payload.
    #[must_use]
    pub fn with_structured(mut self, value: Value) -> Self {
        self.structured_content = Some(value);
        self
    }

    /// Attaches the full data payload.
    #[must_use]
    pub fn with_meta(mut self, value: Value) -> Self {
        self.meta = Some(value);
        self
    }

    /// Returns the text of the first content item.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|c| match c {
            ToolContent::Text { text } => text.as_str(),
        })
    }
}

/// A decoded tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoTool {
    /// List every todo with stats.
    GetTodos,
    /// Append a new todo.
    AddTodo {
        /// Trimmed, non-empty title.
        title: String,
    },
    /// Flip the completed flag of a todo.
    ToggleTodo {
        /// Target identifier.
        id: String,
    },
    /// Remove a todo.
    DeleteTodo {
        /// Target identifier.
        id: String,
    },
    /// Remove every completed todo.
    ClearCompleted,
}

#[derive(Deserialize)]
struct NoArgs {}

#[derive(Deserialize)]
struct TitleArgs {
    title: String,
}

// Models sometimes send numeric ids even though the schema says string.
#[derive(Deserialize)]
#[serde(untagged)]
enum IdValue {
    Text(String),
    Number(u64),
}

#[derive(Deserialize)]
struct IdArgs {
    id: IdValue,
}

impl IdArgs {
    fn into_id(self) -> String {
        match self.id {
            IdValue::Text(s) => s,
            IdValue::Number(n) => n.to_string(),
        }
    }
}

impl TodoTool {
    /// Decodes a `tools/call` name and arguments.
    ///
    /// # Errors
    ///
    /// Returns a user-facing message if the tool is unknown or the arguments
    /// do not match its schema.
    pub fn parse(name: &str, arguments: Value) -> Result<Self, String> {
        let arguments = if arguments.is_null() {
            json!({})
        } else {
            arguments
        };

        match name {
            "get_todos" => decode::<NoArgs>(name, arguments).map(|_| Self::GetTodos),
            "add_todo" => {
                let args: TitleArgs = decode(name, arguments)?;
                let title = args.title.trim();
                if title.is_empty() {
                    return Err("Title must not be empty".to_string());
                }
                Ok(Self::AddTodo {
                    title: title.to_string(),
                })
            }
            "toggle_todo" => decode::<IdArgs>(name, arguments).map(|a| Self::ToggleTodo {
                id: a.into_id(),
            }),
            "delete_todo" => decode::<IdArgs>(name, arguments).map(|a| Self::DeleteTodo {
                id: a.into_id(),
            }),
            "clear_completed" => decode::<NoArgs>(name, arguments).map(|_| Self::ClearCompleted),
            _ => Err(format!("Unknown tool: {name}")),
        }
    }

    /// Runs the tool against the store.
    #[must_use]
    pub fn call(self, store: &TodoStore) -> ToolCallResult {
        match self {
            Self::GetTodos => get_todos(store),
            Self::AddTodo { title } => add_todo(store, &title),
            Self::ToggleTodo { id } => toggle_todo(store, &id),
            Self::DeleteTodo { id } => delete_todo(store, &id),
            Self::ClearCompleted => clear_completed(store),
        }
    }
}

fn decode<T>(name: &str, arguments: Value) -> Result<T, String>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(arguments).map_err(|e| format!("Invalid arguments for {name}: {e}"))
}

fn preview(todos: &[Todo]) -> &[Todo] {
    &todos[..todos.len().min(PREVIEW_LIMIT)]
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        "todo"
    } else {
        "todos"
    }
}

fn totals_line(stats: TodoStats) -> String {
    format!(
        "{} {} total, {} completed, {} pending.",
        stats.total,
        plural(stats.total),
        stats.completed,
        stats.pending
    )
}

fn get_todos(store: &TodoStore) -> ToolCallResult {
    let todos = store.list();
    let stats = TodoStats::of(&todos);
    let summary = if stats.total == 0 {
        "Your todo list is empty.".to_string()
    } else {
        format!(
            "You have {} {} ({} completed, {} pending).",
            stats.total,
            plural(stats.total),
            stats.completed,
            stats.pending
        )
    };

    ToolCallResult::text(summary.clone())
        .with_structured(json!({
            "todos": preview(&todos),
            "summary": summary,
        }))
        .with_meta(json!({
            "todos": todos,
            "stats": stats,
        }))
}

fn add_todo(store: &TodoStore, title: &str) -> ToolCallResult {
    let Snapshot {
        outcome: added,
        todos,
    } = store.update(|list| list.add(title));
    tracing::debug!(id = %added.id, "Added todo");

    ToolCallResult::text(format!(
        "Added \"{}\" (id {}). {}",
        added.title,
        added.id,
        totals_line(TodoStats::of(&todos))
    ))
    .with_structured(json!({
        "addedTodo": added,
        "todos": preview(&todos),
    }))
    .with_meta(json!({
        "todos": todos,
        "addedTodo": added,
    }))
}

fn toggle_todo(store: &TodoStore, id: &str) -> ToolCallResult {
    let Snapshot { outcome, todos } = store.update(|list| list.toggle(id));
    let toggled = match outcome {
        Ok(todo) => todo,
        Err(e) => return ToolCallResult::error(e.to_string()),
    };
    let state = if toggled.completed {
        "completed"
    } else {
        "not completed"
    };

    ToolCallResult::text(format!(
        "Marked \"{}\" as {state}. {}",
        toggled.title,
        totals_line(TodoStats::of(&todos))
    ))
    .with_structured(json!({
        "toggledTodo": toggled,
        "todos": preview(&todos),
    }))
    .with_meta(json!({
        "todos": todos,
        "toggledTodo": toggled,
    }))
}

fn delete_todo(store: &TodoStore, id: &str) -> ToolCallResult {
    let Snapshot { outcome, todos } = store.update(|list| list.delete(id));
    let deleted = match outcome {
        Ok(todo) => todo,
        Err(e) => return ToolCallResult::error(e.to_string()),
    };

    ToolCallResult::text(format!(
        "Deleted \"{}\". {}",
        deleted.title,
        totals_line(TodoStats::of(&todos))
    ))
    .with_structured(json!({
        "deletedTodo": deleted,
        "todos": preview(&todos),
    }))
    .with_meta(json!({
        "todos": todos,
        "deletedTodo": deleted,
    }))
}

fn clear_completed(store: &TodoStore) -> ToolCallResult {
    let Snapshot {
        outcome: cleared,
        todos,
    } = store.update(TodoList::clear_completed);

    ToolCallResult::text(format!(
        "Cleared {cleared} completed {}. {}",
        plural(cleared),
        totals_line(TodoStats::of(&todos))
    ))
    .with_structured(json!({
        "clearedCount": cleared,
        "todos": preview(&todos),
    }))
    .with_meta(json!({
        "todos": todos,
        "clearedCount": cleared,
    }))
}

/// Widget binding shared by every tool.
fn widget_meta(invoking: &str, invoked: &str) -> Value {
    json!({
        "openai/outputTemplate": WIDGET_TEMPLATE_URI,
        "openai/toolInvocation/invoking": invoking,
        "openai/toolInvocation/invoked": invoked,
        "openai/widgetAccessible": true,
    })
}

fn id_schema(action: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": {
                "type": "string",
                "description": format!("Identifier of the todo to {action}")
            }
        },
        "required": ["id"],
        "additionalProperties": false
    })
}

fn empty_schema() -> Value {
    json!({
        "type": "object",
        "properties": {},
        "additionalProperties": false
    })
}

/// Returns the list of available tools.
#[must_use]
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_todos".to_string(),
            title: Some("Show todos".to_string()),
            description: Some(
                "Show the current todo list with completed and pending counts.".to_string(),
            ),
            input_schema: empty_schema(),
            annotations: Some(json!({ "readOnlyHint": true })),
            meta: Some(widget_meta("Loading todos", "Todos loaded")),
        },
        ToolDefinition {
            name: "add_todo".to_string(),
            title: Some("Add todo".to_string()),
            description: Some("Add a new todo item to the end of the list.".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "title": {
                        "type": "string",
                        "minLength": 1,
                        "description": "What needs to be done"
                    }
                },
                "required": ["title"],
                "additionalProperties": false
            }),
            annotations: Some(json!({ "readOnlyHint": false })),
            meta: Some(widget_meta("Adding todo", "Todo added")),
        },
        ToolDefinition {
            name: "toggle_todo".to_string(),
            title: Some("Toggle todo".to_string()),
            description: Some(
                "Mark a todo as completed, or as not completed if it already is.".to_string(),
            ),
            input_schema: id_schema("toggle"),
            annotations: Some(json!({ "readOnlyHint": false, "idempotentHint": false })),
            meta: Some(widget_meta("Updating todo", "Todo updated")),
        },
        ToolDefinition {
            name: "delete_todo".to_string(),
            title: Some("Delete todo".to_string()),
            description: Some("Delete a todo by its id.".to_string()),
            input_schema: id_schema("delete"),
            annotations: Some(json!({ "readOnlyHint": false, "destructiveHint": true })),
            meta: Some(widget_meta("Deleting todo", "Todo deleted")),
        },
        ToolDefinition {
            name: "clear_completed".to_string(),
            title: Some("Clear completed".to_string()),
            description: Some("Remove every completed todo from the list.".to_string()),
            input_schema: empty_schema(),
            annotations: Some(json!({ "readOnlyHint": false, "destructiveHint": true })),
            meta: Some(widget_meta("Clearing completed todos", "Completed todos cleared")),
        },
    ]
}
