//! The `qtipack init` command.

use anyhow::Result;

use crate::config::CONFIG_FILE;

pub fn execute() -> Result<()> {
    if std::path::Path::new(CONFIG_FILE).exists() {
        println!("{CONFIG_FILE} already exists, skipping.");
    } else {
        std::fs::write(CONFIG_FILE, SAMPLE_CONFIG)?;
        println!("Created {CONFIG_FILE}");
    }

    std::fs::create_dir_all("quizzes")?;
    let example_path = std::path::Path::new("quizzes/example.toml");
    if example_path.exists() {
        println!("quizzes/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_QUIZ)?;
        println!("Created quizzes/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit quizzes/example.toml");
    println!("  2. Run: qtipack validate --quiz quizzes/example.toml");
    println!("  3. Run: qtipack build --quiz quizzes/example.toml");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# qtipack configuration

# qti21 or qti30
default_format = "qti30"
output_dir = "./qtipack-out"
strict_identifiers = false
shuffle_choices = false
# assets_dir = "${HOME}/quiz-media"
"#;

const EXAMPLE_QUIZ: &str = r#"[quiz]
title = "Example Quiz"
description = "<p>A short quiz to get started.</p>"

[[entries]]
kind = "single_choice"
title = "Arithmetic"
prompt = "<p>What is 2 + 3?</p>"
points = 1
feedback = { correct = "<p>Correct!</p>", incorrect = "<p>Try adding again.</p>" }
[[entries.choices]]
text = "6"
[[entries.choices]]
text = "1"
feedback = "<p>That is 3 - 2.</p>"
[[entries.choices]]
text = "5"
correct = true

[[entries]]
kind = "true_false"
title = "Sky"
prompt = "<p>The sky is blue.</p>"
points = 2
answer = true

[[entries]]
kind = "text"
title = "Part two"
text = "<p>The following questions are drawn at random.</p>"

[[entries]]
kind = "group"
title = "Capitals"
pick = 1
[[entries.questions]]
kind = "short_answer"
title = "France"
prompt = "<p>What is the capital of France?</p>"
answers = ["Paris"]
[[entries.questions]]
kind = "numerical"
title = "Pi"
prompt = "<p>Give pi to two decimal places.</p>"
numeric = [{ value = 3.14, tolerance = 0.005 }]

[[entries]]
kind = "essay"
title = "Reflection"
prompt = "<p>What did you learn?</p>"
points = 5
"#;
