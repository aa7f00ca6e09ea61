//! Interactive session: one `SessionState` carried through all three steps.

use std::collections::BTreeSet;

use inquire::{InquireError, Select, Text};
use owo_colors::OwoColorize;
use storyline_lib::topics::extract_titles;
use storyline_lib::{
    ChatCompletion, FieldError, FieldSelection, GLYPH_LEGEND, LinkChecker, ResearchOutcome,
    SessionState, Workflow, WorkflowError,
};

const STEP_DISCOVER: &str = "1. Discover topics";
const STEP_RESEARCH: &str = "2. Deep research";
const STEP_SCRIPT: &str = "3. Write script";
const STEP_QUIT: &str = "Quit";

const CUSTOM_FIELD: &str = "Other (enter your own field)";
const MANUAL_TOPIC: &str = "Enter a topic manually";

/// What the user did at a prompt.
enum Answer<T> {
    Value(T),
    /// Escape: back to the main menu.
    Back,
    /// Ctrl-C: leave the session.
    Quit,
}

fn answer<T>(result: Result<T, InquireError>) -> Answer<T> {
    match result {
        Ok(value) => Answer::Value(value),
        Err(InquireError::OperationCanceled) => Answer::Back,
        Err(InquireError::OperationInterrupted) => Answer::Quit,
        Err(e) => {
            eprintln!("{} Prompt error: {}", "⚠".yellow(), e);
            Answer::Quit
        }
    }
}

pub async fn run<G, C>(workflow: &Workflow<G, C>)
where
    G: ChatCompletion,
    C: LinkChecker + 'static,
{
    let mut state = SessionState::new();

    loop {
        let steps = vec![STEP_DISCOVER, STEP_RESEARCH, STEP_SCRIPT, STEP_QUIT];
        let step = match answer(Select::new("What next?", steps).prompt()) {
            Answer::Value(STEP_QUIT) | Answer::Quit => break,
            Answer::Back => continue,
            Answer::Value(step) => step,
        };

        let keep_going = match step {
            STEP_DISCOVER => discover(workflow, &mut state).await,
            STEP_RESEARCH => research(workflow, &mut state).await,
            _ => script(workflow, &state).await,
        };
        if !keep_going {
            break;
        }
    }
}

fn report_error(context: &str, error: &WorkflowError) {
    match error {
        WorkflowError::Field(FieldError::EmptyCustomField) | WorkflowError::EmptyTopic => {
            println!("{} {}", "⚠".yellow(), error)
        }
        _ => println!("{} {}: {}", "✗".red().bold(), context, error),
    }
}

/// Returns false when the user asked to leave.
async fn discover<G, C>(workflow: &Workflow<G, C>, state: &mut SessionState) -> bool
where
    G: ChatCompletion,
    C: LinkChecker + 'static,
{
    let mut labels: Vec<String> = FieldSelection::PREDEFINED
        .iter()
        .map(|f| f.to_string())
        .collect();
    labels.push(CUSTOM_FIELD.to_string());

    let choice = match answer(Select::new("Research field", labels).raw_prompt()) {
        Answer::Value(choice) => choice,
        Answer::Back => return true,
        Answer::Quit => return false,
    };

    let field = match FieldSelection::PREDEFINED.get(choice.index) {
        Some(field) => field.clone(),
        None => match answer(Text::new("Field to research:").prompt()) {
            Answer::Value(text) => FieldSelection::Custom(text),
            Answer::Back => return true,
            Answer::Quit => return false,
        },
    };

    println!("{} Discovering topics for: {}", "→".cyan(), field);
    match workflow.discover(state, &field).await {
        Ok(annotated) => {
            println!("\n{}\n\n{}\n", annotated, GLYPH_LEGEND.dimmed());
        }
        Err(e) => report_error("Discovery failed", &e),
    }
    true
}

async fn research<G, C>(workflow: &Workflow<G, C>, state: &mut SessionState) -> bool
where
    G: ChatCompletion,
    C: LinkChecker + 'static,
{
    let mut options = extract_titles(&state.discovered_topics_text);
    let topic = if options.is_empty() {
        Text::new("Topic to research:").prompt()
    } else {
        options.push(MANUAL_TOPIC.to_string());
        match answer(Select::new("Topic to research", options).prompt()) {
            Answer::Value(choice) if choice == MANUAL_TOPIC => {
                Text::new("Topic to research:").prompt()
            }
            Answer::Value(choice) => Ok(choice),
            Answer::Back => return true,
            Answer::Quit => return false,
        }
    };
    let topic = match answer(topic) {
        Answer::Value(topic) => topic,
        Answer::Back => return true,
        Answer::Quit => return false,
    };

    println!(
        "{} Researching \"{}\" (this can take several minutes)",
        "→".cyan(),
        topic.trim()
    );
    match workflow.research(state, &topic).await {
        Ok(outcome) => {
            if let ResearchOutcome::Cached(_) = outcome {
                println!("{} Loaded cached research", "✓".green());
            } else {
                println!("{} Research complete and saved", "✓".green());
            }
            println!("\n{}\n", outcome.report());
        }
        Err(e) => {
            // Still usable for a script in this session.
            if let WorkflowError::Unsaved { report, .. } = &e {
                println!("\n{}\n", report);
            }
            report_error("Research failed", &e);
        }
    }
    true
}

async fn script<G, C>(workflow: &Workflow<G, C>, state: &SessionState) -> bool
where
    G: ChatCompletion,
    C: LinkChecker + 'static,
{
    let mut topics: BTreeSet<String> = workflow.store().topics().into_iter().collect();
    topics.extend(state.research_results.keys().cloned());

    if topics.is_empty() {
        println!(
            "{} No researched topics yet. Run deep research first.",
            "⚠".yellow()
        );
        return true;
    }

    let mut select = Select::new("Topic for the script", topics.into_iter().collect());
    if let Some(selected) = state.selected_topic.as_deref()
        && let Some(index) = select.options.iter().position(|t| t == selected)
    {
        select = select.with_starting_cursor(index);
    }

    let topic = match answer(select.prompt()) {
        Answer::Value(topic) => topic,
        Answer::Back => return true,
        Answer::Quit => return false,
    };

    println!("{} Writing script for \"{}\"", "→".cyan(), topic);
    match workflow.script(state, &topic).await {
        Ok(script) => println!("\n{}\n", script),
        Err(e) => report_error("Script generation failed", &e),
    }
    true
}
