//! Prompt templates for typed function calls

use crate::codec::{TypeDescriptor, describe_schema, describe_type, example_for};
use crate::session::entities::Message;
use serde_json::Value;

/// A named argument passed to a typed function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionArgument {
    pub name: String,
    pub ty: TypeDescriptor,
    pub value: Value,
}

impl FunctionArgument {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            ty,
            value: value.into(),
        }
    }
}

/// Initial prompts for one typed function call.
///
/// ```
/// use tooloop_domain::codec::TypeDescriptor;
/// use tooloop_domain::prompt::{FunctionArgument, FunctionPrompt};
///
/// let prompt = FunctionPrompt::new("Translate the text into French.", TypeDescriptor::Text)
///     .with_argument(FunctionArgument::new("text", TypeDescriptor::Text, "Good morning"));
/// let messages = prompt.messages();
/// assert_eq!(messages.len(), 2);
/// assert!(messages[1].text().contains("- text: Good morning"));
/// ```
#[derive(Debug, Clone)]
pub struct FunctionPrompt {
    description: String,
    arguments: Vec<FunctionArgument>,
    return_type: TypeDescriptor,
}

impl FunctionPrompt {
    pub fn new(description: impl Into<String>, return_type: TypeDescriptor) -> Self {
        Self {
            description: description.into(),
            arguments: Vec::new(),
            return_type,
        }
    }

    pub fn with_argument(mut self, argument: FunctionArgument) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn return_type(&self) -> &TypeDescriptor {
        &self.return_type
    }

    /// System prompt: task, parameter types and the expected return shape
    pub fn system_prompt(&self) -> String {
        let parameters = if self.arguments.is_empty() {
            "(none)".to_string()
        } else {
            self.arguments
                .iter()
                .map(|a| format!("  - {}: {}", a.name, describe_type(&a.ty)))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let mut prompt = format!(
            r#"Your task is to produce a result that satisfies the function description and the user's request.

Function description:
{}

Parameters you will receive:
{}

Type of content you must return:
{}"#,
            self.description,
            parameters,
            describe_type(&self.return_type)
        );

        if self.is_structured() {
            let schema = pretty(&describe_schema(&self.return_type));
            let example = pretty(&example_for(&self.return_type));
            prompt.push_str(&format!(
                r#"

Return JSON matching this structure:
{}

Example:
{}"#,
                schema, example
            ));
        }

        prompt.push_str(
            r#"

Requirements:
1. Use the available tools if they help complete the task.
2. Do not wrap the result in markdown or code blocks; output the content or JSON directly."#,
        );
        prompt
    }

    /// User prompt listing argument values
    pub fn user_prompt(&self) -> String {
        let values = self
            .arguments
            .iter()
            .map(|a| match &a.value {
                Value::String(s) => format!("  - {}: {}", a.name, s),
                other => format!("  - {}: {}", a.name, other),
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"The parameters provided are:
{}

Return the result directly without any explanation or formatting."#,
            values
        )
    }

    /// `[system, user]` messages for the loop
    pub fn messages(&self) -> Vec<Message> {
        vec![
            Message::system(self.system_prompt()),
            Message::user(self.user_prompt()),
        ]
    }

    /// Whether the return type needs a JSON schema in the prompt
    fn is_structured(&self) -> bool {
        let mut ty = &self.return_type;
        while let TypeDescriptor::Optional(inner) = ty {
            ty = inner;
        }
        !matches!(ty, TypeDescriptor::Text | TypeDescriptor::Primitive(_))
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
