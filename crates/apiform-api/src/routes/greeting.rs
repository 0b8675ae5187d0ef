//! # Greeting Operation
//!
//! - GET /greeting/{name} — Greet a person by name.

use serde::{Deserialize, Serialize};

use apiform_schema::{FieldSchema, Method, OperationSchema, ValidatedInput};

use crate::dispatch::{handler, Handler, HandlerError, HandlerOutput};

pub const OPERATION_ID: &str = "get-greeting";

#[derive(Debug, Deserialize)]
struct GreetingInput {
    name: String,
}

#[derive(Debug, Serialize)]
struct GreetingOutput {
    message: String,
}

pub fn schema() -> OperationSchema {
    OperationSchema::new(OPERATION_ID, Method::Get, "/greeting/{name}")
        .summary("Get a greeting")
        .description("Get a greeting for a person by name.")
        .tag("Greetings")
        .input(
            FieldSchema::string("name")
                .in_path()
                .max_length(30)
                .example("world")
                .description("Name to greet"),
        )
        .output(
            FieldSchema::string("message")
                .required()
                .example("Hello, world!")
                .description("Greeting message"),
        )
}

pub fn handler_for() -> Handler {
    handler(greet)
}

fn greet(input: &ValidatedInput) -> Result<HandlerOutput, HandlerError> {
    let GreetingInput { name } = input.deserialize()?;
    HandlerOutput::from_serialize(&GreetingOutput {
        message: format!("Hello, {name}!"),
    })
}
