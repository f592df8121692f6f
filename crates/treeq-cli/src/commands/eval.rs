use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Args;
use treeq::{
    AllAtOnceEvaluator, EngineConfig, Error, KeyMatchMode, Source, StreamEvaluator, YamlPrinter,
    compile,
};

const STDIN_PATH: &str = "-";

#[derive(Args, Debug, Clone)]
pub struct EvalArgs {
    #[arg(value_name = "EXPRESSION")]
    pub expression: String,
    /// Input files; `-` reads standard input. Standard input is read when none are given.
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,
    /// Ignore all input and evaluate against a single null document.
    #[arg(short = 'n', long)]
    pub null_input: bool,
    /// Match map keys literally instead of treating `*` as a wildcard.
    #[arg(long)]
    pub exact_keys: bool,
    /// Do not print `---` between results of different documents.
    #[arg(long)]
    pub no_doc_separator: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Stream,
    AllAtOnce,
}

pub fn run(args: &EvalArgs, mode: Mode, out: &mut dyn Write, stdin: &mut dyn Read) -> anyhow::Result<()> {
    let expr = compile(&args.expression)
        .with_context(|| format!("invalid expression '{}'", args.expression))?;
    let config = engine_config(args);
    let mut printer = YamlPrinter::new(out).with_document_separators(!args.no_doc_separator);
    let sources = sources(args, stdin);

    let documents = match mode {
        Mode::Stream => StreamEvaluator::new(config).evaluate_sources(&expr, sources, &mut printer)?,
        Mode::AllAtOnce => {
            AllAtOnceEvaluator::new(config).evaluate_sources(&expr, sources, &mut printer)?
        }
    };
    tracing::debug!(documents, ?mode, "evaluation finished");
    Ok(())
}

pub(crate) fn engine_config(args: &EvalArgs) -> EngineConfig {
    let key_match = if args.exact_keys { KeyMatchMode::Exact } else { KeyMatchMode::Wildcard };
    EngineConfig::builder().with_key_match(key_match).build()
}

/// Sources in command-line order, read lazily so a stream evaluation never
/// holds more than one file.
fn sources<'a>(
    args: &'a EvalArgs,
    stdin: &'a mut dyn Read,
) -> Box<dyn Iterator<Item = Result<Source, Error>> + 'a> {
    if args.null_input {
        return Box::new(std::iter::empty());
    }
    if args.files.is_empty() {
        return Box::new(std::iter::once(read_stdin(stdin)));
    }
    Box::new(args.files.iter().map(move |path| {
        if path == Path::new(STDIN_PATH) {
            read_stdin(stdin)
        } else {
            tracing::debug!(path = %path.display(), "reading source");
            Source::from_path(path)
        }
    }))
}

fn read_stdin(stdin: &mut dyn Read) -> Result<Source, Error> {
    let mut content = Vec::new();
    stdin.read_to_end(&mut content)?;
    Ok(Source::anonymous(content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn args(expression: &str) -> EvalArgs {
        EvalArgs {
            expression: expression.to_string(),
            files: Vec::new(),
            null_input: false,
            exact_keys: false,
            no_doc_separator: false,
        }
    }

    #[rstest]
    #[case(false, KeyMatchMode::Wildcard)]
    #[case(true, KeyMatchMode::Exact)]
    fn key_match_follows_the_flag(#[case] exact: bool, #[case] mode: KeyMatchMode) {
        let config = engine_config(&EvalArgs { exact_keys: exact, ..args(".") });
        assert_eq!(config.key_match, mode);
    }

    #[rstest]
    fn null_input_ignores_stdin() {
        let mut stdin = "a: 1".as_bytes();
        let args = EvalArgs { null_input: true, ..args(".") };
        assert_eq!(sources(&args, &mut stdin).count(), 0);
    }

    #[rstest]
    fn stdin_is_the_default_source() {
        let mut stdin = "a: 1".as_bytes();
        let read: Vec<_> = sources(&args("."), &mut stdin).collect::<Result<_, _>>().unwrap();
        assert_eq!(read, [Source::anonymous("a: 1")]);
    }

    #[rstest]
    fn stream_mode_prints_each_document() {
        let mut out = Vec::new();
        let mut stdin = "a: 1\n---\na: 2\n".as_bytes();
        run(&args(".a"), Mode::Stream, &mut out, &mut stdin).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1\n---\n2\n");
    }
}
