// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Prompts sent to the text generator.

/// Ask for a rewritten CV. The response replaces the document text verbatim,
/// so the prompt insists on bare CV text.
pub fn rewrite_prompt(job_description: &str, cv_text: &str) -> String {
    format!(
        "Revise the following CV to better match this job description. \
         Focus on skills, experience, and keywords. Return ONLY the enhanced CV text \
         without any additional commentary or explanations.\n\n\
         Job Description:\n{job_description}\n\n\
         Original CV:\n{cv_text}\n\n\
         Enhanced CV:"
    )
}

/// Ask for a Markdown feedback report on the CV.
pub fn feedback_prompt(job_description: &str, cv_text: &str) -> String {
    format!(
        "You are a professional career coach. Review the candidate's CV against the job \
         description and produce a concise feedback report. The report must contain the \
         following sections in Markdown format:\n\
         # CV Feedback Summary\n\
         ## Overall Impression\n\
         ## Strengths\n\
         - bullet list of strong points\n\
         ## Gaps or Concerns\n\
         - bullet list of weaknesses or missing information\n\
         ## Recommended Improvements\n\
         - bullet list of specific, actionable improvements\n\
         ## Keywords To Incorporate\n\
         - bullet list of keywords from the job description that should appear in the CV\n\
         Ensure all advice is factual, based only on the provided CV and job description. \
         Do not rewrite the CV.\n\n\
         Job Description:\n{job_description}\n\nCV:\n{cv_text}\n\nFeedback Report:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrite_prompt_embeds_inputs_in_order() {
        let prompt = rewrite_prompt("Rust engineer", "Jane Doe\nGo developer");
        let job = prompt.find("Job Description:\nRust engineer").unwrap();
        let cv = prompt.find("Original CV:\nJane Doe\nGo developer").unwrap();
        assert!(job < cv);
        assert!(prompt.starts_with("Revise the following CV"));
        assert!(prompt.ends_with("Enhanced CV:"));
    }

    #[test]
    fn feedback_prompt_lists_every_section() {
        let prompt = feedback_prompt("Rust engineer", "Jane Doe");
        for section in [
            "# CV Feedback Summary\n",
            "## Overall Impression\n",
            "## Strengths\n",
            "## Gaps or Concerns\n",
            "## Recommended Improvements\n",
            "## Keywords To Incorporate\n",
        ] {
            assert!(prompt.contains(section), "missing {section:?}");
        }
        assert!(prompt.ends_with("CV:\nJane Doe\n\nFeedback Report:"));
    }
}
