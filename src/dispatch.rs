//! JSON dispatch: one entry point for every operation
//!
//! Options arrive as a JSON value and results leave as one, so hosts that speak
//! JSON (the CLI, an RPC layer) never name the per-operation types. `null`
//! means "all defaults" for operations whose options have them.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::capabilities::Operation;
use crate::context::OperationContext;
use crate::error::{GitOpsError, Result};
use crate::provider::Provider;

fn options<T: DeserializeOwned + Default>(operation: Operation, value: Value) -> Result<T> {
    if value.is_null() {
        return Ok(T::default());
    }
    required(operation, value)
}

fn required<T: DeserializeOwned>(operation: Operation, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| GitOpsError::validation(operation, format!("invalid options: {}", e)))
}

fn output<T: Serialize>(operation: Operation, result: T) -> Result<Value> {
    serde_json::to_value(result)
        .map_err(|e| GitOpsError::internal(operation, format!("cannot serialize result: {}", e)))
}

/// Run `operation` on `provider` with JSON options.
pub async fn dispatch(
    provider: &Provider,
    operation: Operation,
    value: Value,
    ctx: &OperationContext,
) -> Result<Value> {
    // Gate before decoding so an unsupported call reports as such even with
    // options the operation would reject.
    provider.gate(operation)?;

    tracing::debug!(
        op = operation.as_str(),
        provider = provider.name(),
        trace = %ctx.trace,
        "dispatch"
    );

    let op = operation;
    match operation {
        Operation::Init => output(op, provider.init(&options(op, value)?, ctx).await?),
        Operation::Clone => output(op, provider.clone_repo(&required(op, value)?, ctx).await?),
        Operation::Status => output(op, provider.status(&options(op, value)?, ctx).await?),
        Operation::Add => output(op, provider.add(&options(op, value)?, ctx).await?),
        Operation::Commit => output(op, provider.commit(&required(op, value)?, ctx).await?),
        Operation::Log => output(op, provider.log(&options(op, value)?, ctx).await?),
        Operation::Show => output(op, provider.show(&options(op, value)?, ctx).await?),
        Operation::Diff => output(op, provider.diff(&options(op, value)?, ctx).await?),
        Operation::Branch => output(op, provider.branch(&options(op, value)?, ctx).await?),
        Operation::Checkout => output(op, provider.checkout(&required(op, value)?, ctx).await?),
        Operation::Merge => output(op, provider.merge(&options(op, value)?, ctx).await?),
        Operation::Rebase => output(op, provider.rebase(&required(op, value)?, ctx).await?),
        Operation::CherryPick => output(op, provider.cherry_pick(&required(op, value)?, ctx).await?),
        Operation::Remote => output(op, provider.remote(&options(op, value)?, ctx).await?),
        Operation::Fetch => output(op, provider.fetch(&options(op, value)?, ctx).await?),
        Operation::Push => output(op, provider.push(&options(op, value)?, ctx).await?),
        Operation::Pull => output(op, provider.pull(&options(op, value)?, ctx).await?),
        Operation::Tag => output(op, provider.tag(&options(op, value)?, ctx).await?),
        Operation::Stash => output(op, provider.stash(&options(op, value)?, ctx).await?),
        Operation::Worktree => output(op, provider.worktree(&options(op, value)?, ctx).await?),
        Operation::Reset => output(op, provider.reset(&options(op, value)?, ctx).await?),
        Operation::Blame => output(op, provider.blame(&required(op, value)?, ctx).await?),
        Operation::Reflog => output(op, provider.reflog(&options(op, value)?, ctx).await?),
    }
}
