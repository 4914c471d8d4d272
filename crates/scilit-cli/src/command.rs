//! REPL command parsing. Paper numbers are 1-based on screen and 0-based
//! once parsed; highlight and reference numbers are shown 0-based.

use anyhow::{anyhow, bail, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Search with the given context, or the current draft when `None`.
    Search(Option<String>),
    Keywords(String),
    Page(usize),
    Show { json: bool },
    /// Toggle full text, or open it at a highlight's matched sentence.
    Open { paper: usize, highlight: Option<usize> },
    /// Look up a paper's reference by title.
    Jump { paper: usize, reference: usize },
    Lookup(String),
    Fold,
    Select(usize),
    Draft(String),
    Refine,
    Export,
    Back,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  search [context]         search (keeps the current context when omitted)
  keywords <k1;k2;...>     set keywords for the next search
  page <n>                 go to page n
  show [--json]            print the current page
  open <paper> [h]         toggle full text, or open it at highlight h
  jump <paper> <ref>       look up reference <ref> of <paper>
  lookup <title>           look up a paper by title
  fold                     collapse all full texts on this page
  select <paper>           select/deselect a paper for citation
  draft <text>             replace the citation draft
  refine                   regenerate the selected citation from the current query
  export                   BibTeX and MLA for the selected paper
  back                     return to the list before the last lookup
  help | quit";

/// Parse one input line; blank lines give `None`.
pub fn parse(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };
    let mut args = rest.split_whitespace();

    let command = match name {
        "search" | "s" => Command::Search((!rest.is_empty()).then(|| rest.to_string())),
        "keywords" | "k" => Command::Keywords(rest.to_string()),
        "page" | "p" => Command::Page(number(args.next(), "page")?),
        "show" => Command::Show { json: rest == "--json" },
        "open" | "o" => Command::Open {
            paper: paper(args.next())?,
            highlight: args.next().map(|h| number(Some(h), "highlight")).transpose()?,
        },
        "jump" | "j" => Command::Jump {
            paper: paper(args.next())?,
            reference: number(args.next(), "reference")?,
        },
        "lookup" | "l" => Command::Lookup(required(rest, "title")?),
        "fold" => Command::Fold,
        "select" => Command::Select(paper(args.next())?),
        "draft" => Command::Draft(required(rest, "citation text")?),
        "refine" => Command::Refine,
        "export" => Command::Export,
        "back" | "b" => Command::Back,
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => bail!("unknown command {other:?}; try `help`"),
    };
    Ok(Some(command))
}

fn number(arg: Option<&str>, what: &str) -> Result<usize> {
    let arg = arg.ok_or_else(|| anyhow!("missing {what} number"))?;
    arg.parse().map_err(|_| anyhow!("{what} must be a number, got {arg:?}"))
}

fn paper(arg: Option<&str>) -> Result<usize> {
    match number(arg, "paper")? {
        0 => bail!("papers are numbered from 1"),
        n => Ok(n - 1),
    }
}

fn required(rest: &str, what: &str) -> Result<String> {
    if rest.is_empty() {
        bail!("missing {what}");
    }
    Ok(rest.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ok(line: &str) -> Command {
        parse(line).unwrap().unwrap()
    }

    #[test]
    fn test_blank_line() {
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn test_search_keeps_full_context() {
        assert_eq!(ok("search  graph neural networks "), Command::Search(Some("graph neural networks".into())));
        assert_eq!(ok("search"), Command::Search(None));
        assert_eq!(ok("keywords GNN;drug"), Command::Keywords("GNN;drug".into()));
    }

    #[test]
    fn test_paper_numbers_are_one_based() {
        assert_eq!(ok("select 1"), Command::Select(0));
        assert_eq!(ok("open 3 0"), Command::Open { paper: 2, highlight: Some(0) });
        assert_eq!(ok("open 3"), Command::Open { paper: 2, highlight: None });
        assert_eq!(ok("jump 2 5"), Command::Jump { paper: 1, reference: 5 });
        assert!(parse("select 0").is_err());
    }

    #[test]
    fn test_bad_input() {
        assert!(parse("page").is_err());
        assert!(parse("page two").is_err());
        assert!(parse("lookup").is_err());
        assert!(parse("frobnicate").is_err());
    }

    #[test]
    fn test_misc_commands() {
        assert_eq!(ok("show --json"), Command::Show { json: true });
        assert_eq!(ok("show"), Command::Show { json: false });
        assert_eq!(ok("lookup Attention Is All You Need"), Command::Lookup("Attention Is All You Need".into()));
        assert_eq!(ok("q"), Command::Quit);
    }
}
