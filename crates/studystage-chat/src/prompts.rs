//! Prompt assembly for answers, quizzes, study plans and keywords.

use std::fmt;

use serde::{Deserialize, Serialize};

use studystage_vector::SearchHit;

use crate::client::ChatMessage;

/// Default character budget for retrieved context.
pub const MAX_CONTEXT_CHARS: usize = 3000;

/// Concatenate hit texts in rank order, at most `max_chars` characters in
/// total. The hit that crosses the budget is truncated and nothing after it
/// is used.
pub fn merge_contexts(hits: &[SearchHit], max_chars: usize) -> String {
    let mut parts = Vec::new();
    let mut total = 0;

    for hit in hits {
        if total >= max_chars {
            break;
        }
        let remaining = max_chars - total;
        let len = hit.text.chars().count();
        let part: String = if len > remaining {
            hit.text.chars().take(remaining).collect()
        } else {
            hit.text.clone()
        };
        total += len.min(remaining);
        parts.push(part);
    }

    parts.join("\n\n")
}

/// Quiz difficulty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizLevel {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl QuizLevel {
    fn guidance(self) -> &'static str {
        match self {
            QuizLevel::Easy => "Ask about definitions and facts stated directly in the material.",
            QuizLevel::Medium => "Mix recall questions with questions that need one step of reasoning.",
            QuizLevel::Hard => {
                "Ask questions that combine several ideas or apply them to new situations."
            }
        }
    }
}

impl fmt::Display for QuizLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QuizLevel::Easy => "easy",
            QuizLevel::Medium => "medium",
            QuizLevel::Hard => "hard",
        };
        f.write_str(s)
    }
}

pub fn answer_prompt(question: &str, context: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "You are a study assistant. Answer questions using only the provided documents. \
             If the documents do not contain the answer, say so.",
        ),
        ChatMessage::user(format!(
            "Documents:\n{}\n\nQuestion:\n{}",
            context, question
        )),
    ]
}

pub fn quiz_prompt(topic: &str, level: QuizLevel, context: &str) -> Vec<ChatMessage> {
    let user = format!(
        "Write 3 to 5 multiple-choice study questions based on the context below.

Rules:
- Number the questions \"Q1.\", \"Q2.\" and so on. Do not include empty questions.
- Every question has exactly four options, written on their own lines as:
  1) option A
  2) option B
  3) option C
  4) option D
- State the correct option as \"Answer: 3\".
- Follow with a line starting with \"Explanation:\".

Example:
Q1. Which of these is not a feature of Python?
1) Indentation is part of the syntax.
2) It is an interpreted language.
3) It supports pointer arithmetic.
4) It is dynamically typed.
Answer: 3
Explanation: Python has no pointer arithmetic; that is a feature of C and C++.

Difficulty: {level}. {guidance}

Topic:
{topic}

Context:
{context}",
        level = level,
        guidance = level.guidance(),
        topic = topic,
        context = context,
    );

    vec![
        ChatMessage::system("You are a teacher who writes study quizzes from course material."),
        ChatMessage::user(user),
    ]
}

/// `context` is `None` (or empty) when the plan is made without documents.
pub fn plan_prompt(goal: &str, days: u32, hours: u32, context: Option<&str>) -> Vec<ChatMessage> {
    let material = match context {
        Some(text) if !text.trim().is_empty() => format!("Reference material:\n{}", text),
        _ => "No documents are available; recommend a route that works without them.".to_string(),
    };
    let user = format!(
        "Build a study plan that fits the learner's goal and constraints.\n\n\
         Goal: {}\nDuration: {} day(s)\nStudy time per day: {} hour(s)\n\n\
         {}\n\n\
         Give a detailed plan broken down day by day.",
        goal, days, hours, material
    );

    vec![
        ChatMessage::system("You are an expert study planner."),
        ChatMessage::user(user),
    ]
}

pub fn keyword_prompt(text: &str, top_k: usize) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system("You analyse documents and extract their key terms."),
        ChatMessage::user(format!(
            "Extract the {} most important keywords from the document below. \
             Output only the keywords, separated by commas, with no explanation.\n\n\
             Document:\n{}",
            top_k, text
        )),
    ]
}

/// Split a comma-separated model reply into at most `top_k` keywords.
///
/// Line breaks are folded into spaces first, so a keyword the model wrapped
/// across lines stays one keyword.
pub fn parse_keywords(reply: &str, top_k: usize) -> Vec<String> {
    reply
        .replace('\n', " ")
        .split(',')
        .map(str::trim)
        .filter(|kw| !kw.is_empty())
        .take(top_k)
        .map(str::to_string)
        .collect()
}
