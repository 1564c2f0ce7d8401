use crate::dataset::{ColumnType, Dataset};

const PREVIEW_ROWS: usize = 5;

/// System instruction: dataset schema, a preview, the tool catalogue and the
/// reply format.
pub fn system_prompt(dataset: &Dataset) -> String {
    let summary = dataset.summary();
    let columns: Vec<String> = summary
        .columns
        .iter()
        .map(|c| {
            let kind = match c.column_type {
                ColumnType::Numeric => "numeric",
                ColumnType::Text => "text",
            };
            format!("- {} ({}, {} missing)", c.name, kind, c.missing)
        })
        .collect();

    format!(
        "You are a data analyst working with a tabular dataset loaded from a CSV file. \
Answer the user's question about this dataset by calling tools, one per reply, until you \
know the answer.\n\
\n\
The dataset has {rows} rows and {cols} columns:\n\
{columns}\n\
\n\
First rows:\n\
```csv\n\
{preview}```\n\
\n\
Tools (name: input):\n\
- shape: {{}} -> row and column counts\n\
- describe: {{\"column\": optional}} -> count, mean, std_dev, min, median, max of numeric columns\n\
- head: {{\"n\": optional, default 5}} -> first rows as CSV\n\
- value_counts: {{\"column\", \"limit\": optional}} -> most frequent values\n\
- aggregate: {{\"column\", \"func\": count|unique|sum|mean|median|min|max|std, \"group_by\": optional}}\n\
- filter_count: {{\"column\", \"op\": eq|ne|gt|ge|lt|le|contains, \"value\"}} -> number of matching rows\n\
- correlation: {{\"x\", \"y\"}} -> Pearson correlation of two numeric columns\n\
- plot: {{\"kind\": histogram|bar|scatter|line, \"x\", \"y\": optional, \"bins\": optional, \"agg\": optional, \"title\": optional}} \
-> draws a chart shown to the user\n\
\n\
Reply with exactly one JSON object and nothing else. To call a tool:\n\
{{\"thought\": \"...\", \"action\": \"<tool>\", \"action_input\": {{...}}}}\n\
When you know the answer:\n\
{{\"thought\": \"...\", \"final_answer\": \"...\"}}\n\
Each tool result comes back as a message starting with \"Observation:\". \
If the user asks for a chart, call plot before giving the final answer. \
Answer in the language of the question.",
        rows = summary.rows,
        cols = summary.columns.len(),
        columns = columns.join("\n"),
        preview = dataset.head_csv(PREVIEW_ROWS),
    )
}

pub fn observation(text: &str) -> String {
    format!("Observation: {}", text)
}

pub fn format_correction(error: &str) -> String {
    format!(
        "Observation: Could not parse your reply ({}). Reply with a single JSON object \
containing either \"action\" and \"action_input\", or \"final_answer\".",
        error
    )
}
