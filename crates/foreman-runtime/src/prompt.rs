//! System prompt composition for the admin loop and for workers.

use foreman_core::worker::{WorkerContext, WorkerType};

use crate::phase::Phase;

/// Exact marker a worker emits to signal completion.
pub const COMPLETION_SENTINEL: &str = "<<TASK_COMPLETE>>";

/// Static orchestration policy prepended to every admin request.
const ADMIN_POLICY: &str = "\
You are Foreman, an orchestrating assistant. You answer the user directly \
when you can, and decompose larger requests into a planned task whose steps \
you delegate to specialized workers.

Rules:
- You never search the web, run code, or fetch URLs yourself. Those \
capabilities belong to workers; use delegate_to_worker.
- Keep plans small and concrete. One step, one deliverable.
- When you are blocked on a decision only the user can make, call ask_user.
- Report failures honestly and offer to retry, skip, or abort.";

/// Phase-specific guidance appended to the admin policy.
fn phase_guidance(phase: Phase) -> &'static str {
    match phase {
        Phase::Discovery => {
            "Current phase: discovery. Understand what the user wants. \
             Task-management tools are available but premature; prefer \
             questions and quick answers. Create a task only once the goal \
             is clear."
        }
        Phase::Planning => {
            "Current phase: planning. Design a task with planned_tasks \
             (action new_task) listing concrete steps and worker types. \
             Creating the task moves the conversation into execution."
        }
        Phase::Execution => {
            "Current phase: execution. Work the active task step by step: \
             delegate each step with delegate_to_worker, then record the \
             outcome with planned_tasks (action update_task). After a step \
             marked as a checkpoint, always ask_user for approval before \
             the next step. If a step fails, pause and offer to retry, \
             skip, or abort. Completing the task moves the conversation \
             to delivery."
        }
        Phase::Review => {
            "Current phase: review. Inspect step results before moving on. \
             Use planned_tasks to mark steps completed, failed, or skipped; \
             re-delegate when a result is not good enough."
        }
        Phase::Delivery => {
            "Current phase: delivery. Present the results and artifacts to \
             the user. Task-management tools should not be needed; start a \
             new discovery if the user asks for more."
        }
    }
}

/// Full admin system prompt for the given phase.
#[must_use]
pub fn admin_system(phase: Phase) -> String {
    format!("{ADMIN_POLICY}\n\n{}", phase_guidance(phase))
}

/// Profile-specific worker system prompt.
#[must_use]
pub fn worker_system(worker_type: WorkerType) -> String {
    let role = match worker_type {
        WorkerType::Researcher => {
            "You are a research worker. Ground every claim in sources found \
             via search or URL context, and cite them."
        }
        WorkerType::Coder => {
            "You are a coding worker. Write and execute code to solve the \
             objective; show the final code in fenced blocks."
        }
        WorkerType::Analyst => {
            "You are an analysis worker. Combine search with executed \
             computations; state assumptions explicitly."
        }
        WorkerType::Writer => {
            "You are a writing worker. Produce polished prose from the \
             material you are given; you have no external tools."
        }
        WorkerType::General => {
            "You are a general-purpose worker with search, code execution, \
             and URL access. Pick the lightest approach that delivers."
        }
    };
    format!(
        "{role}\n\nYou are completing one bounded sub-task for an orchestrator, \
         not chatting with a user. When the deliverable is ready, end your \
         message with {COMPLETION_SENTINEL}."
    )
}

/// Initial user prompt handed to a worker.
#[must_use]
pub fn worker_user(context: &WorkerContext) -> String {
    let mut prompt = format!("Objective: {}\n", context.objective);
    if !context.step_description.is_empty() {
        prompt.push_str(&format!("Step description: {}\n", context.step_description));
    }
    if !context.constraints.is_empty() {
        prompt.push_str("Constraints:\n");
        for constraint in &context.constraints {
            prompt.push_str(&format!("- {constraint}\n"));
        }
    }
    if !context.previous_step_outputs.is_empty() {
        prompt.push_str("Results of previous steps:\n");
        for (i, output) in context.previous_step_outputs.iter().enumerate() {
            prompt.push_str(&format!("--- step {} ---\n{output}\n", i + 1));
        }
    }
    prompt.push_str(&format!(
        "\nYou have at most {} turns. When done, end with {COMPLETION_SENTINEL}.",
        context.max_turns
    ));
    prompt
}

/// Continuation nudge between worker turns.
#[must_use]
pub fn worker_continuation(turns_remaining: u32) -> String {
    format!(
        "Continue working toward the objective. {turns_remaining} turns remain. \
         End with {COMPLETION_SENTINEL} when the deliverable is ready."
    )
}
