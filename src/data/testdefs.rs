//! Given/when/then test definitions kept in a ticket's test field.
//!
//! Only text between `<begin>` and `<end>` markers is read. Inside a block,
//! `Folder:`, `Solution Test Plan:` and `Fix Versions:` apply to the whole
//! ticket; each `Name:` or `Scenario:` starts a test.

/// Appended to a ticket that has no usable definitions yet.
pub const TEMPLATE: &str = "
<begin>
Folder: /Windows/MyTestFeature  (This is the folder in the test repository)
Solution Test Plan: 24.X My Awesome Plan (Will create a new test plan if this name doesn't exist)
Fix Versions: PMfW 24.3         (Comma separated list of fix versions)

Name: PMfW - <Feature> - <Summary Text>
Description: <Description>
Steps:
Given <Preconditions>
And <Step 1>
When <Step 2>
Then <Step 3>
<end>
";

const STEP_PREFIXES: [&str; 7] = ["given", "and", "when", "then", "but", "|", "example"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestDefinition {
    pub name: String,
    pub description: String,
    pub steps: Vec<String>,
}

impl TestDefinition {
    /// Steps as one Gherkin document.
    pub fn gherkin(&self) -> String {
        self.steps.join("\n")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestDefinitions {
    pub folder: Option<String>,
    pub test_plan: Option<String>,
    pub fix_versions: Vec<String>,
    pub tests: Vec<TestDefinition>,
}

impl TestDefinitions {
    pub fn parse(text: &str) -> Self {
        let mut defs = Self::default();
        let lines: Vec<&str> = text.lines().collect();
        let mut inside = false;

        for (i, line) in lines.iter().enumerate() {
            let lower = line.trim().to_lowercase();
            if lower.starts_with("<begin>") {
                inside = true;
            } else if lower.starts_with("<end>") {
                inside = false;
            }
            if !inside {
                continue;
            }

            if lower.starts_with("folder:") {
                defs.folder = value(line);
            } else if lower.starts_with("solution test plan:") {
                defs.test_plan = value(line);
            } else if lower.starts_with("fix versions:") {
                defs.fix_versions = value(line)
                    .map(|v| {
                        v.split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or_default();
            } else if lower.starts_with("name:") || lower.starts_with("scenario:") {
                defs.tests.push(read_test(line, &lines[i + 1..]));
            }
        }
        defs
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// At least one test and somewhere to put it.
    pub fn is_valid(&self) -> bool {
        !self.tests.is_empty() && self.folder.is_some()
    }
}

/// What happened to the named test plan after a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanUpdate {
    /// Tests were added to an existing plan of this name.
    Added(String),
    /// A new plan was created with this key.
    Created(String),
}

/// Outcome of one background test-generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRun {
    pub ticket: String,
    pub folder: String,
    /// Keys of the created tests, in definition order.
    pub tests: Vec<String>,
    pub plan: Option<PlanUpdate>,
}

impl TestRun {
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "Created {} tests for {} in {}: {}",
            self.tests.len(),
            self.ticket,
            self.folder,
            self.tests.join(", ")
        )];
        match &self.plan {
            Some(PlanUpdate::Added(name)) => lines.push(format!("Added to test plan {}", name)),
            Some(PlanUpdate::Created(key)) => lines.push(format!("Created test plan {}", key)),
            None => {}
        }
        lines
    }
}

/// Text after the first colon, trimmed; `None` when blank.
fn value(line: &str) -> Option<String> {
    line.split_once(':')
        .map(|(_, rest)| rest.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn is_step(line: &str) -> bool {
    let lower = line.trim().to_lowercase();
    STEP_PREFIXES.iter().any(|p| lower.starts_with(p))
}

fn read_test(header: &str, rest: &[&str]) -> TestDefinition {
    let name = value(header).unwrap_or_default();
    let mut description = None;
    let mut steps = Vec::new();

    for (j, line) in rest.iter().enumerate() {
        let lower = line.trim().to_lowercase();
        if lower.starts_with("name:") || lower.starts_with("scenario:") || lower.starts_with("<end>")
        {
            break;
        }
        if lower.starts_with("description:") {
            description = value(line);
        } else if lower.starts_with("steps:") {
            steps = collect_steps(&rest[j + 1..]);
            break;
        } else if lower.starts_with("given") {
            // Scenario style: steps start without a header.
            steps = collect_steps(&rest[j..]);
            break;
        }
    }

    TestDefinition {
        description: description.unwrap_or_else(|| name.clone()),
        name,
        steps,
    }
}

fn collect_steps(lines: &[&str]) -> Vec<String> {
    lines
        .iter()
        .filter(|l| !l.trim_start().starts_with('@'))
        .take_while(|l| is_step(l))
        .map(|l| l.trim().to_string())
        .collect()
}
