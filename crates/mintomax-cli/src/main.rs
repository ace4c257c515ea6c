use std::collections::HashMap;
use std::ffi::OsString;
use std::io::{self, BufRead, Write};

use mintomax_error::{MinToMaxError, Result, SUPPORTED_DATATYPES};
use mintomax_func::{
    DEFAULT_SEPARATOR, ErasedAggregateFunction, FunctionCallContext, FunctionRegistry,
    register_builtins,
};
use mintomax_types::{Datum, MemoryRegion, TypeTag, TypedArg};
use serde::Deserialize;
use tracing::{debug, trace, warn};

const FUNCTION_NAME: &str = "min_to_max";
const DEFAULT_ELEMENT_TYPE: &str = "bigint";
const DEFAULT_NULL_TOKEN: &str = "NULL";
const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CliOptions {
    config_path: Option<String>,
    separator: Option<String>,
    element_type: Option<String>,
    null_token: Option<String>,
    grouped: bool,
    log_level: Option<String>,
    show_help: bool,
}

/// File configuration, every field optional in the JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CliConfig {
    separator: String,
    element_type: String,
    null_token: String,
    grouped: bool,
    log_level: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_owned(),
            element_type: DEFAULT_ELEMENT_TYPE.to_owned(),
            null_token: DEFAULT_NULL_TOKEN.to_owned(),
            grouped: false,
            log_level: DEFAULT_LOG_LEVEL.to_owned(),
        }
    }
}

impl CliOptions {
    /// Command-line flags win over the file configuration.
    fn apply(&self, mut config: CliConfig) -> CliConfig {
        if let Some(separator) = &self.separator {
            separator.clone_into(&mut config.separator);
        }
        if let Some(element_type) = &self.element_type {
            element_type.clone_into(&mut config.element_type);
        }
        if let Some(null_token) = &self.null_token {
            null_token.clone_into(&mut config.null_token);
        }
        if let Some(level) = &self.log_level {
            level.clone_into(&mut config.log_level);
        }
        config.grouped |= self.grouped;
        config
    }
}

/// Validated settings the input loop runs with.
#[derive(Debug)]
struct Settings {
    separator: String,
    element_type: TypeTag,
    null_token: String,
    grouped: bool,
}

impl Settings {
    fn resolve(config: CliConfig) -> Result<Self> {
        let element_type = TypeTag::from_sql_name(&config.element_type).ok_or_else(|| {
            MinToMaxError::config(format!("unknown element type `{}`", config.element_type))
        })?;
        Ok(Self {
            separator: config.separator,
            element_type,
            null_token: config.null_token,
            grouped: config.grouped,
        })
    }

    /// Split line `line_no` (1-based) into its group key and value cell.
    fn split_row<'a>(&self, line_no: usize, line: &'a str) -> Result<(&'a str, &'a str)> {
        if !self.grouped {
            return Ok(("", line));
        }
        line.split_once('\t')
            .ok_or_else(|| MinToMaxError::MalformedRow {
                line: line_no,
                detail: "missing TAB between group key and value".to_owned(),
            })
    }

    fn parse_cell(&self, cell: &str) -> Result<TypedArg> {
        let trimmed = cell.trim();
        if trimmed.is_empty() || trimmed == self.null_token {
            return Ok(TypedArg::null(self.element_type));
        }
        Datum::parse(self.element_type, cell).map(TypedArg::new)
    }
}

/// One aggregation group: its key, its own region, and the erased state.
struct Group {
    key: String,
    region: MemoryRegion,
    state: Box<dyn std::any::Any + Send>,
}

impl Group {
    fn new(key: &str, function: &ErasedAggregateFunction) -> Self {
        Self {
            key: key.to_owned(),
            region: MemoryRegion::new(format!("group {key}")),
            state: function.initial_state(),
        }
    }
}

fn main() {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();

    let exit_code = run(std::env::args_os(), &mut input, &mut stdout, &mut stderr);
    drop(input);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run<I, R, W, E>(args: I, input: &mut R, out: &mut W, err: &mut E) -> i32
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
{
    let options = match parse_args(args) {
        Ok(options) => options,
        Err(message) => {
            let _ = writeln!(err, "error: {message}");
            let _ = write_usage(err);
            return 2;
        }
    };

    if options.show_help {
        if write_usage(out).is_err() {
            return 1;
        }
        return 0;
    }

    let config = match load_config(options.config_path.as_deref()) {
        Ok(config) => options.apply(config),
        Err(error) => return report(err, &error),
    };
    init_tracing(&config.log_level);

    let settings = match Settings::resolve(config) {
        Ok(settings) => settings,
        Err(error) => return report(err, &error),
    };
    debug!(
        element_type = %settings.element_type,
        separator = %settings.separator,
        grouped = settings.grouped,
        "settings resolved"
    );

    match aggregate_input(&settings, input, out) {
        Ok(()) => 0,
        Err(error) => report(err, &error),
    }
}

fn report<E>(err: &mut E, error: &MinToMaxError) -> i32
where
    E: Write,
{
    let _ = writeln!(err, "error: {error}");
    if let Some(hint) = error.suggestion() {
        let _ = writeln!(err, "hint: {hint}");
    }
    error.exit_code()
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_lowercase())),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .ok(); // already installed
}

fn load_config(path: Option<&str>) -> Result<CliConfig> {
    let Some(path) = path else {
        return Ok(CliConfig::default());
    };
    let contents = std::fs::read_to_string(path)
        .map_err(|error| MinToMaxError::config(format!("failed reading `{path}`: {error}")))?;
    serde_json::from_str(&contents)
        .map_err(|error| MinToMaxError::config(format!("invalid JSON in `{path}`: {error}")))
}

/// Feed every input line through the aggregate and print one result per group.
///
/// Groups are reported in first-seen order. Without `--grouped` the whole
/// input is one group, and an empty input still yields one (empty) result.
fn aggregate_input<R, W>(settings: &Settings, input: &mut R, out: &mut W) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    let mut registry = FunctionRegistry::new();
    register_builtins(&mut registry);
    let function = registry
        .find_aggregate(FUNCTION_NAME, 2)
        .ok_or_else(|| MinToMaxError::internal(format!("{FUNCTION_NAME} is not registered")))?;

    let separator = TypedArg::new(settings.separator.as_str());
    let mut groups: Vec<Group> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for (index, line) in input.lines().enumerate() {
        let line = line?;
        let line_no = index + 1;
        let (key, cell) = settings.split_row(line_no, &line)?;
        let value = settings.parse_cell(cell).inspect_err(|error| {
            warn!(line = line_no, %error, "rejected input row");
        })?;

        let slot = if let Some(&slot) = slots.get(key) {
            slot
        } else {
            groups.push(Group::new(key, &*function));
            slots.insert(key.to_owned(), groups.len() - 1);
            groups.len() - 1
        };
        let group = &mut groups[slot];
        let cx = FunctionCallContext::aggregate(&group.region);
        function.step(&cx, &mut group.state, &[value, separator.clone()])?;
    }

    if groups.is_empty() && !settings.grouped {
        groups.push(Group::new("", &*function));
    }
    debug!(groups = groups.len(), "input exhausted");

    for group in groups {
        let cx = FunctionCallContext::aggregate(&group.region);
        let result = function.finalize(&cx, group.state)?;
        if settings.grouped {
            writeln!(out, "{}\t{result}", group.key)?;
        } else {
            writeln!(out, "{result}")?;
        }
        let peak = group.region.peak_bytes();
        let released = group.region.reset();
        trace!(key = %group.key, released, peak, "group region released");
    }
    Ok(())
}

fn parse_args<I>(args: I) -> std::result::Result<CliOptions, String>
where
    I: IntoIterator<Item = OsString>,
{
    let mut iter = args.into_iter();
    let _argv0 = iter.next();
    let mut options = CliOptions::default();

    while let Some(argument) = iter.next() {
        let arg = argument.to_string_lossy();
        let arg_str = arg.as_ref();

        let (flag, inline) = match arg_str.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value.to_owned())),
            _ => (arg_str, None),
        };

        let slot = match flag {
            "-h" | "--help" => {
                options.show_help = true;
                continue;
            }
            "-g" | "--grouped" => {
                options.grouped = true;
                continue;
            }
            "-c" | "--config" => &mut options.config_path,
            "-s" | "--separator" => &mut options.separator,
            "-t" | "--type" => &mut options.element_type,
            "--null" => &mut options.null_token,
            "--log-level" => &mut options.log_level,
            _ if arg_str.starts_with('-') => return Err(format!("unknown option `{arg_str}`")),
            _ => return Err(format!("unexpected argument `{arg_str}`")),
        };

        if slot.is_some() {
            return Err(format!("`{flag}` may only be provided once"));
        }
        let value = match inline {
            Some(value) => value,
            None => iter
                .next()
                .map(|next| next.to_string_lossy().into_owned())
                .ok_or_else(|| format!("missing value for `{flag}`"))?,
        };
        *slot = Some(value);
    }

    Ok(options)
}

fn write_usage<W>(out: &mut W) -> io::Result<()>
where
    W: Write,
{
    writeln!(
        out,
        "Usage: mintomax [-t|--type TYPE] [-s|--separator SEP] [--null TOKEN]\n\
         \x20               [-g|--grouped] [-c|--config FILE.json] [--log-level LEVEL]\n\
         \n\
         Reads one value per line from stdin and prints `min<SEP>max`.\n\
         With --grouped each line is `key<TAB>value` and one line is printed per key.\n\
         Supported element types: {SUPPORTED_DATATYPES}.\n\
         \n\
         Examples:\n\
         \n\
         printf '3\\n1\\nNULL\\n7\\n' | mintomax -t integer\n\
         printf '2.5\\n-1\\n' | mintomax -t float8 -s '|'\n\
         printf 'a\\t1\\nb\\t5\\na\\t9\\n' | mintomax --grouped\n",
    )
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::fs;
    use std::io::Cursor;
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::{CliConfig, CliOptions, parse_args, run};

    fn parse_from(args: &[&str]) -> Result<CliOptions, String> {
        let os_args: Vec<OsString> = args.iter().map(OsString::from).collect();
        parse_args(os_args)
    }

    fn run_with(args: &[&str], input: &str) -> (i32, String, String) {
        let os_args: Vec<OsString> = args.iter().map(OsString::from).collect();
        let mut input = Cursor::new(input.as_bytes().to_vec());
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = run(os_args, &mut input, &mut out, &mut err);
        (
            code,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    fn temp_config(tag: &str, contents: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "mintomax-{tag}-{}-{nanos}.json",
            std::process::id()
        ));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_parse_args_defaults() {
        let options = parse_from(&["mintomax"]).unwrap();
        assert_eq!(options, CliOptions::default());
    }

    #[test]
    fn test_parse_args_flags_and_inline_values() {
        let options =
            parse_from(&["mintomax", "-t", "real", "--separator=|", "--grouped", "--null", "-"])
                .unwrap();
        assert_eq!(options.element_type.as_deref(), Some("real"));
        assert_eq!(options.separator.as_deref(), Some("|"));
        assert_eq!(options.null_token.as_deref(), Some("-"));
        assert!(options.grouped);
    }

    #[test]
    fn test_parse_args_empty_separator_is_allowed() {
        let options = parse_from(&["mintomax", "-s", ""]).unwrap();
        assert_eq!(options.separator.as_deref(), Some(""));
    }

    #[test]
    fn test_parse_args_rejects_bad_input() {
        assert!(parse_from(&["mintomax", "--bogus"]).is_err());
        assert!(parse_from(&["mintomax", "stray"]).is_err());
        assert!(parse_from(&["mintomax", "--type"]).is_err());
        let err = parse_from(&["mintomax", "-s", "a", "--separator", "b"]).unwrap_err();
        assert!(err.contains("only be provided once"), "{err}");
    }

    #[test]
    fn test_flags_override_config() {
        let options = parse_from(&["mintomax", "-s", "~", "-g"]).unwrap();
        let merged = options.apply(CliConfig {
            separator: ",".to_owned(),
            element_type: "int2".to_owned(),
            ..CliConfig::default()
        });
        assert_eq!(merged.separator, "~");
        assert_eq!(merged.element_type, "int2");
        assert!(merged.grouped);
        assert_eq!(merged.null_token, "NULL");
    }

    #[test]
    fn test_help_goes_to_stdout() {
        let (code, out, err) = run_with(&["mintomax", "--help"], "");
        assert_eq!(code, 0);
        assert!(out.starts_with("Usage: mintomax"));
        assert!(out.contains("DOUBLE PRECISION"));
        assert!(err.is_empty());
    }

    #[test]
    fn test_usage_error_exit_code() {
        let (code, out, err) = run_with(&["mintomax", "--nope"], "");
        assert_eq!(code, 2);
        assert!(out.is_empty());
        assert!(err.starts_with("error: unknown option `--nope`"));
    }

    #[test]
    fn test_integers_with_nulls() {
        let (code, out, _) = run_with(&["mintomax", "-t", "integer"], "3\n1\nNULL\n7\n\n1\n");
        assert_eq!(code, 0);
        assert_eq!(out, "1->7\n");
    }

    #[test]
    fn test_doubles_with_custom_separator() {
        let (code, out, _) =
            run_with(&["mintomax", "-t", "float8", "-s", "|"], "2.5\nNULL\n-1.0\n9.25\n");
        assert_eq!(code, 0);
        assert_eq!(out, "-1|9.25\n");
    }

    #[test]
    fn test_empty_input_prints_empty_line() {
        let (code, out, _) = run_with(&["mintomax"], "");
        assert_eq!(code, 0);
        assert_eq!(out, "\n");
    }

    #[test]
    fn test_grouped_input_keeps_first_seen_order() {
        let (code, out, _) = run_with(
            &["mintomax", "--grouped", "-t", "int2"],
            "b\t5\na\t1\nb\t-2\na\t9\nc\tNULL\n",
        );
        assert_eq!(code, 0);
        assert_eq!(out, "b\t-2->5\na\t1->9\nc\t\n");
    }

    #[test]
    fn test_grouped_row_without_tab_is_rejected() {
        let (code, out, err) = run_with(&["mintomax", "--grouped"], "a\t1\n5\na\t2\n");
        assert_eq!(code, 1);
        assert!(out.is_empty());
        assert!(err.contains("malformed input at line 2"), "{err}");
        assert!(err.contains("hint: "), "{err}");
    }

    #[test]
    fn test_grouped_key_with_empty_value_is_null() {
        let (code, out, _) = run_with(&["mintomax", "-g"], "a\t\na\t3\n");
        assert_eq!(code, 0);
        assert_eq!(out, "a\t3->3\n");
    }

    #[test]
    fn test_text_elements_are_rejected_at_finalize() {
        let (code, out, err) = run_with(&["mintomax", "-t", "text"], "apple\npear\n");
        assert_eq!(code, 1);
        assert!(out.is_empty());
        assert!(err.contains("unsupported datatype"), "{err}");
        assert!(err.contains("hint: "), "{err}");
    }

    #[test]
    fn test_malformed_value_reports_error() {
        let (code, out, err) = run_with(&["mintomax", "-t", "integer"], "1\nabc\n");
        assert_eq!(code, 1);
        assert!(out.is_empty());
        assert!(err.contains("invalid input syntax"), "{err}");
    }

    #[test]
    fn test_unknown_element_type_is_config_error() {
        let (code, _, err) = run_with(&["mintomax", "-t", "uuid"], "1\n");
        assert_eq!(code, 1);
        assert!(err.contains("unknown element type `uuid`"), "{err}");
    }

    #[test]
    fn test_config_file_is_applied() {
        let path = temp_config(
            "apply",
            r#"{"separator": " .. ", "element_type": "real", "null_token": "?"}"#,
        );
        let path_str = path.to_string_lossy().into_owned();
        let (code, out, err) = run_with(&["mintomax", "--config", &path_str], "1.5\n?\n-0.25\n");
        let _ = fs::remove_file(&path);
        assert_eq!(code, 0, "{err}");
        assert_eq!(out, "-0.25 .. 1.5\n");
    }

    #[test]
    fn test_config_file_rejects_unknown_fields() {
        let path = temp_config("unknown", r#"{"sep": "|"}"#);
        let path_str = path.to_string_lossy().into_owned();
        let (code, _, err) = run_with(&["mintomax", "-c", &path_str], "1\n");
        let _ = fs::remove_file(&path);
        assert_eq!(code, 1);
        assert!(err.contains("invalid configuration"), "{err}");
    }

    #[test]
    fn test_missing_config_file() {
        let (code, _, err) = run_with(
            &["mintomax", "-c", "/nonexistent/mintomax-config.json"],
            "1\n",
        );
        assert_eq!(code, 1);
        assert!(err.contains("failed reading"), "{err}");
    }
}
