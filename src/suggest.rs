use once_cell::sync::Lazy;

/// Verb-keyed starter subtasks, checked in order. The subject phrase replaces
/// `{noun}` with the title's original casing.
static VERB_TEMPLATES: Lazy<Vec<(&'static str, [&'static str; 5])>> = Lazy::new(|| {
    vec![
        (
            "launch",
            [
                "Finalize launch strategy for {noun}",
                "Prepare marketing materials for {noun}",
                "Conduct final QA and testing",
                "Execute launch-day plan",
                "Monitor post-launch performance",
            ],
        ),
        (
            "create",
            [
                "Define requirements for {noun}",
                "Outline the structure of {noun}",
                "Develop the first draft / prototype",
                "Review and iterate on the draft",
                "Finalize and polish {noun}",
            ],
        ),
        (
            "write",
            [
                "Research and gather information for {noun}",
                "Create a detailed outline",
                "Write the first draft of {noun}",
                "Edit for clarity, grammar, and style",
                "Get feedback and finalize the text",
            ],
        ),
        (
            "design",
            [
                "Gather inspiration and create a mood board for {noun}",
                "Sketch initial concepts and wireframes",
                "Develop high-fidelity mock-ups for {noun}",
                "Select color palette and typography",
                "Prepare final assets and design specs",
            ],
        ),
        (
            "plan",
            [
                "Define the main objectives of {noun}",
                "Identify key milestones and deliverables",
                "Allocate resources and set a budget",
                "Create a detailed timeline",
                "Identify potential risks and mitigations",
            ],
        ),
    ]
});

const DEFAULT_TEMPLATES: [&str; 4] = [
    "Break down the major goals",
    "Identify the first actionable step",
    "Set a deadline",
    "Gather necessary resources",
];

/// Derives starter subtasks from a project title. Matching is
/// case-insensitive on the leading verb; no match falls back to the generic
/// four-step list.
pub fn suggest(title: &str) -> Vec<String> {
    let lower = title.to_lowercase();
    for (verb, templates) in VERB_TEMPLATES.iter() {
        if lower.starts_with(verb) {
            let noun = title.get(verb.len()..).unwrap_or_default().trim();
            return templates
                .iter()
                .map(|template| template.replace("{noun}", noun))
                .collect();
        }
    }
    DEFAULT_TEMPLATES
        .iter()
        .map(|template| (*template).to_string())
        .collect()
}
