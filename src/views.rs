//! HTML pages rendered from read models. Every piece of user text passes
//! through [`escape`].

use std::fmt::{self, Write};

use itertools::Itertools;

use crate::ballot_box::BallotSheet;
use crate::model::{GetPollResponse, Notice, PollSummary};

const STYLE: &str = "\
body { font-family: Arial, sans-serif; background-color: #f4f4f4; text-align: center; }
h1 { color: #333; }
form { background: white; padding: 20px; display: inline-block; border-radius: 10px; box-shadow: 0 0 10px rgba(0, 0, 0, 0.1); margin: 10px; }
label, input { display: block; margin: 10px auto; }
input[type='text'] { width: 80%; padding: 8px; border: 1px solid #ccc; border-radius: 5px; }
input[type='submit'] { background: #28a745; color: white; padding: 10px 15px; border: none; border-radius: 5px; cursor: pointer; }
input[type='submit']:hover { background: #218838; }
ul { list-style: none; padding: 0; }
li { background: white; margin: 5px auto; padding: 10px; border-radius: 5px; width: 50%; box-shadow: 0 0 5px rgba(0, 0, 0, 0.1); }
";

pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Quoted JavaScript string literal, safe inside a `<script>` element.
fn js_string(text: &str) -> String {
    let mut quoted = String::from("'");
    for c in text.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '<' => quoted.push_str("\\x3c"),
            '\n' => quoted.push_str("\\n"),
            c => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}

/// Page shell shared by every view.
pub struct Page {
    title: String,
    body: String,
}

impl Page {
    pub fn new(title: &str) -> Page {
        Page {
            title: escape(title),
            body: String::new(),
        }
    }

    pub fn render(self) -> String {
        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset='utf-8'>\n<title>{}</title>\n<style>\n{}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
            self.title, STYLE, self.body
        )
    }
}

impl Write for Page {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.body.push_str(s);
        Ok(())
    }
}

pub fn poll_index(polls: &[PollSummary]) -> Result<String, fmt::Error> {
    let mut page = Page::new("Polls");
    writeln!(page, "<h1>Polls</h1>")?;
    writeln!(page, "<p><a href='/create_poll'>Create a poll</a></p>")?;
    if polls.is_empty() {
        writeln!(page, "<p>No polls yet.</p>")?;
    } else {
        writeln!(page, "<ul>")?;
        for poll in polls {
            writeln!(page, "<li><a href='/poll/{}'>{}</a></li>", escape(&poll.id), escape(&poll.name))?;
        }
        writeln!(page, "</ul>")?;
    }
    Ok(page.render())
}

pub fn create_poll_form() -> Result<String, fmt::Error> {
    let mut page = Page::new("Create a poll");
    writeln!(page, "<h1>Create a poll</h1>")?;
    writeln!(page, "<form action='/create_poll' method='post'>")?;
    writeln!(page, "<label>Poll name: <input type='text' name='poll_name' required></label>")?;
    writeln!(page, "<input type='submit' value='Create'>")?;
    writeln!(page, "</form>")?;
    writeln!(page, "<p><a href='/'>Back to polls</a></p>")?;
    Ok(page.render())
}

pub fn poll_page(poll: &GetPollResponse) -> Result<String, fmt::Error> {
    let id = escape(&poll.id);
    let mut page = Page::new(&poll.name);
    writeln!(page, "<h1>{}</h1>", escape(&poll.name))?;

    writeln!(page, "<form action='/poll/{}/vote' method='post'>", id)?;
    writeln!(page, "<label>Name: <input type='text' name='voter_name' required></label>")?;
    if !poll.options.is_empty() {
        writeln!(page, "<label>Choose an existing option:</label>")?;
        for option in &poll.options {
            writeln!(page, "<input type='radio' name='option_id' value='{}'> {}<br>", option.id, escape(&option.name))?;
        }
    }
    writeln!(page, "<label>Or suggest a new option: <input type='text' name='new_option'></label>")?;
    writeln!(page, "<input type='submit' value='Vote'>")?;
    writeln!(page, "</form>")?;

    writeln!(page, "<form action='/poll/{}/add_option' method='post'>", id)?;
    writeln!(page, "<label>New option: <input type='text' name='option_name' required></label>")?;
    writeln!(page, "<input type='submit' value='Add option'>")?;
    writeln!(page, "</form>")?;

    writeln!(page, "<h2>Results:</h2>\n<ul>")?;
    for option in &poll.options {
        let voters = option.voters.iter().map(|v| escape(v)).join(", ");
        writeln!(page, "<li>{} - {} votes{}</li>",
            escape(&option.name),
            option.votes,
            if voters.is_empty() { String::new() } else { format!(" ({})", voters) })?;
    }
    writeln!(page, "</ul>")?;

    writeln!(page, "<h2>Votes:</h2>\n<ul>")?;
    for vote in &poll.votes {
        writeln!(page, "<li>{} voted for {} at {}</li>",
            escape(&vote.voter_name),
            escape(&vote.option_name),
            vote.timestamp.format("%Y-%m-%d %H:%M"))?;
    }
    writeln!(page, "</ul>")?;

    writeln!(page, "<h2>Participants:</h2>\n<ul>")?;
    for participant in &poll.participants {
        writeln!(page, "<li>{}</li>", escape(&participant.name))?;
    }
    writeln!(page, "</ul>")?;

    for (action, label) in [("join", "Join"), ("leave", "Leave")] {
        writeln!(page, "<form action='/poll/{}/{}' method='post'>", id, action)?;
        writeln!(page, "<label>Name: <input type='text' name='participant_name' required></label>")?;
        writeln!(page, "<input type='submit' value='{}'>", label)?;
        writeln!(page, "</form>")?;
    }

    writeln!(page, "<p><a href='/'>Back to polls</a></p>")?;
    Ok(page.render())
}

pub fn ballot_box_page(sheet: &BallotSheet) -> Result<String, fmt::Error> {
    let mut page = Page::new("Vote");
    writeln!(page, "<h1>Vote for an option</h1>")?;
    writeln!(page, "<form action='/votar' method='post'>")?;
    writeln!(page, "<label>Name: <input type='text' name='nome' required></label>")?;
    writeln!(page, "<label>Choose an existing option:</label>")?;
    for name in sheet.options.keys() {
        let name = escape(name);
        writeln!(page, "<input type='radio' name='opcao' value='{}'> {}<br>", name, name)?;
    }
    writeln!(page, "<label>Or add a new option: <input type='text' name='nova_opcao'></label>")?;
    writeln!(page, "<input type='submit' value='Vote'>")?;
    writeln!(page, "</form>")?;

    writeln!(page, "<h2>Results:</h2>\n<ul>")?;
    for (name, votes) in sheet.tallies() {
        writeln!(page, "<li>{} - {} votes</li>", escape(name), votes)?;
    }
    writeln!(page, "</ul>")?;

    writeln!(page, "<h2>Voters:</h2>\n<ul>")?;
    for (name, voters) in &sheet.options {
        for voter in voters {
            writeln!(page, "<li>{} voted for {}</li>", escape(voter), escape(name))?;
        }
    }
    writeln!(page, "</ul>")?;
    Ok(page.render())
}

/// Script that shows `notice` and sends the browser to `location`.
pub fn notice_redirect(notice: Notice, location: &str) -> String {
    format!(
        "<script>alert({});window.location.href={};</script>",
        js_string(notice.message()),
        js_string(location)
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use chrono::Utc;
    use crate::model::{OptionTally, ParticipantSummary, VoteSummary};

    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("<b>'Tom' & \"Jerry\"</b>"), "&lt;b&gt;&#39;Tom&#39; &amp; &quot;Jerry&quot;&lt;/b&gt;");
    }

    #[test]
    fn notice_script() {
        let html = notice_redirect(Notice::DuplicateOption, "/poll/abc");
        assert_eq!(html, "<script>alert('That option already exists!');window.location.href='/poll/abc';</script>");
    }

    #[test]
    fn js_strings_cannot_close_script() {
        assert_eq!(js_string("it's </script>"), "'it\\'s \\x3c/script>'");
    }

    #[test]
    fn poll_page_lists_everything() {
        let go = Arc::new("Go".to_string());
        let ann = Arc::new("<Ann>".to_string());
        let poll = GetPollResponse {
            id: "abc".to_string(),
            name: "Best Language".to_string(),
            created: Utc::now(),
            options: vec![OptionTally { id: 7, name: go.clone(), votes: 1, voters: vec![ann.clone()] }],
            votes: vec![VoteSummary { voter_name: ann, option_name: go, timestamp: Utc::now() }],
            participants: vec![ParticipantSummary { name: "Bob".to_string(), joined: Utc::now() }],
        };

        let html = poll_page(&poll).unwrap();
        assert!(html.contains("<title>Best Language</title>"));
        assert!(html.contains("<input type='radio' name='option_id' value='7'> Go<br>"));
        assert!(html.contains("<li>Go - 1 votes (&lt;Ann&gt;)</li>"));
        assert!(html.contains("&lt;Ann&gt; voted for Go"));
        assert!(html.contains("<li>Bob</li>"));
        assert!(html.contains("action='/poll/abc/leave'"));
        assert!(!html.contains("<Ann>"));
    }

    #[test]
    fn ballot_box_page_shows_voters() {
        let mut sheet = BallotSheet::default();
        sheet.cast("10.0.0.1", "Ann", Some("Animes"), None).unwrap();

        let html = ballot_box_page(&sheet).unwrap();
        assert!(html.contains("<li>Animes - 1 votes</li>"));
        assert!(html.contains("<li>Deuses Gregos - 0 votes</li>"));
        assert!(html.contains("<li>Ann voted for Animes</li>"));
        assert!(html.contains("name='nova_opcao'"));
    }

    #[test]
    fn empty_index() {
        assert!(poll_index(&[]).unwrap().contains("No polls yet."));
    }
}
