// src/compiler/message.rs

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::compiler::project::{ProjectFile, parse_project};
use crate::compiler::{CompilationResult, CompileRequest, Compiler, OutputStructure};
use crate::fs::{TrackedFs, normalize_path};

/// The built-in message compiler.
///
/// Reads the project file and one JSON message catalog per locale, then
/// generates ES modules: a `runtime.js` with the locale state and strategy
/// order, per-locale or per-message function modules depending on the output
/// structure, and a `messages.js` entry point. Message patterns support
/// `{param}` placeholders; anything fancier is out of scope.
///
/// All input reads go through the tracked filesystem so the caller learns
/// what to watch. Inputs are content-hashed; a pass whose hash set matches
/// the previous compilation returns it unchanged instead of regenerating.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageCompiler;

#[async_trait]
impl Compiler for MessageCompiler {
    async fn compile(
        &self,
        request: &CompileRequest<'_>,
        fs: &TrackedFs,
        previous: Option<CompilationResult>,
    ) -> Result<CompilationResult> {
        let options = request.options;

        let project_text = fs
            .read_to_string(&options.project_path)
            .with_context(|| format!("reading project file {}", options.project_path.display()))?;
        let project = parse_project(&project_text)?;

        let project_dir = options
            .project_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut input_hashes = BTreeMap::new();
        input_hashes.insert(
            normalize_path(fs.base_dir(), &options.project_path),
            blake3::hash(project_text.as_bytes()).to_hex().to_string(),
        );

        // One catalog per locale: message name -> pattern.
        let mut catalogs: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for locale in &project.locales {
            let relative = project.message_path.replace("{locale}", locale);
            let path = project_dir.join(relative);
            let bytes = fs
                .read_async(&path)
                .await
                .with_context(|| format!("reading messages for '{locale}' from {}", path.display()))?;
            input_hashes.insert(
                normalize_path(fs.base_dir(), &path),
                blake3::hash(&bytes).to_hex().to_string(),
            );
            catalogs.insert(locale.clone(), parse_catalog(locale, &bytes)?);
        }

        if !request.clean_outdir
            && previous
                .as_ref()
                .is_some_and(|prev| prev.input_hashes == input_hashes)
        {
            debug!("message sources unchanged, keeping previous output");
            return Ok(previous.unwrap_or_default());
        }

        let messages = compile_messages(&project, &catalogs)?;

        if request.clean_outdir && options.outdir.exists() {
            std::fs::remove_dir_all(&options.outdir)
                .with_context(|| format!("cleaning output directory {}", options.outdir.display()))?;
        }

        let mut written = BTreeSet::new();
        write_file(
            &options.outdir.join("runtime.js"),
            &generate_runtime(&project, &options.strategy),
            &mut written,
        )?;

        match options.output_structure {
            OutputStructure::LocaleModules => {
                for locale in &project.locales {
                    write_file(
                        &options.outdir.join("messages").join(format!("{locale}.js")),
                        &generate_locale_module(locale, &messages),
                        &mut written,
                    )?;
                }
                write_file(
                    &options.outdir.join("messages.js"),
                    &generate_locale_index(&project, &messages),
                    &mut written,
                )?;
            }
            OutputStructure::MessageModules => {
                for message in messages.values() {
                    write_file(
                        &options
                            .outdir
                            .join("messages")
                            .join(&message.name)
                            .join("index.js"),
                        &generate_message_module(&project, message),
                        &mut written,
                    )?;
                }
                write_file(
                    &options.outdir.join("messages.js"),
                    &generate_message_index(&messages),
                    &mut written,
                )?;
            }
        }

        if options.emit_declarations {
            write_file(
                &options.outdir.join("messages.d.ts"),
                &generate_message_declarations(&messages),
                &mut written,
            )?;
            write_file(
                &options.outdir.join("runtime.d.ts"),
                RUNTIME_DECLARATIONS,
                &mut written,
            )?;
        }

        Ok(CompilationResult {
            input_hashes,
            written_files: written,
        })
    }
}

/// One message across all locales.
#[derive(Debug, Clone)]
struct CompiledMessage {
    name: String,
    /// Placeholder names, unioned across locales.
    params: BTreeSet<String>,
    /// Locale -> JS template literal body (escaped, placeholders inlined).
    bodies: BTreeMap<String, String>,
}

fn ident_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex is valid"))
}

/// Parse one locale's JSON catalog into name -> pattern. Keys starting with
/// `$` (schema annotations) are skipped.
fn parse_catalog(locale: &str, bytes: &[u8]) -> Result<BTreeMap<String, String>> {
    let raw: BTreeMap<String, Value> = serde_json::from_slice(bytes)
        .with_context(|| format!("parsing message JSON for locale '{locale}'"))?;

    let mut catalog = BTreeMap::new();
    for (name, value) in raw {
        if name.starts_with('$') {
            continue;
        }
        match value {
            Value::String(pattern) => {
                catalog.insert(name, pattern);
            }
            other => {
                return Err(anyhow!(
                    "message '{name}' in locale '{locale}' must be a string, got {other}"
                ));
            }
        }
    }
    Ok(catalog)
}

/// Build the cross-locale message table. The base locale defines the message
/// set; locales missing a message fall back to the base pattern.
fn compile_messages(
    project: &ProjectFile,
    catalogs: &BTreeMap<String, BTreeMap<String, String>>,
) -> Result<BTreeMap<String, CompiledMessage>> {
    let base = catalogs
        .get(&project.base_locale)
        .ok_or_else(|| anyhow!("missing catalog for base locale '{}'", project.base_locale))?;

    let mut messages = BTreeMap::new();
    for (name, base_pattern) in base {
        if !ident_re().is_match(name) {
            return Err(anyhow!(
                "message name '{name}' is not a valid identifier"
            ));
        }

        let mut params = BTreeSet::new();
        let mut bodies = BTreeMap::new();
        for locale in &project.locales {
            let pattern = catalogs
                .get(locale)
                .and_then(|catalog| catalog.get(name))
                .unwrap_or(base_pattern);
            let body = compile_pattern(name, locale, pattern, &mut params)?;
            bodies.insert(locale.clone(), body);
        }

        messages.insert(
            name.clone(),
            CompiledMessage {
                name: name.clone(),
                params,
                bodies,
            },
        );
    }
    Ok(messages)
}

/// Turn a pattern like `"Hello {name}!"` into a JS template literal body,
/// collecting placeholder names along the way.
fn compile_pattern(
    name: &str,
    locale: &str,
    pattern: &str,
    params: &mut BTreeSet<String>,
) -> Result<String> {
    let mut body = String::new();
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                let mut param = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(inner) => param.push(inner),
                        None => {
                            return Err(anyhow!(
                                "unclosed '{{' in message '{name}' for locale '{locale}'"
                            ));
                        }
                    }
                }
                if !ident_re().is_match(&param) {
                    return Err(anyhow!(
                        "invalid placeholder '{{{param}}}' in message '{name}' for locale '{locale}'"
                    ));
                }
                body.push_str(&format!("${{params.{param}}}"));
                params.insert(param);
            }
            '}' => {
                return Err(anyhow!(
                    "unmatched '}}' in message '{name}' for locale '{locale}'"
                ));
            }
            '`' => body.push_str("\\`"),
            '\\' => body.push_str("\\\\"),
            '$' => body.push_str("\\$"),
            other => body.push(other),
        }
    }
    Ok(body)
}

/// Locale tags are not always valid JS identifiers (`de-DE`); this form is.
fn locale_ident(locale: &str) -> String {
    locale.replace('-', "_")
}

fn signature(message: &CompiledMessage) -> &'static str {
    if message.params.is_empty() {
        "()"
    } else {
        "(params = {})"
    }
}

fn call_args(message: &CompiledMessage) -> &'static str {
    if message.params.is_empty() { "()" } else { "(params)" }
}

const GENERATED_HEADER: &str = "// Generated by msgwatch. Do not edit.\n";

fn generate_runtime(project: &ProjectFile, strategy: &[String]) -> String {
    let locales = project
        .locales
        .iter()
        .map(|l| format!("\"{l}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let strategies = strategy
        .iter()
        .map(|s| format!("\"{s}\""))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{GENERATED_HEADER}\n\
         export const baseLocale = \"{base}\";\n\
         export const locales = [{locales}];\n\
         export const strategy = [{strategies}];\n\
         \n\
         let _locale = baseLocale;\n\
         \n\
         export const getLocale = () => _locale;\n\
         \n\
         export const setLocale = (locale) => {{\n\
         \tif (!locales.includes(locale)) {{\n\
         \t\tthrow new Error(`unknown locale: ${{locale}}`);\n\
         \t}}\n\
         \t_locale = locale;\n\
         }};\n",
        base = project.base_locale,
    )
}

fn generate_locale_module(locale: &str, messages: &BTreeMap<String, CompiledMessage>) -> String {
    let mut out = String::from(GENERATED_HEADER);
    for message in messages.values() {
        let body = &message.bodies[locale];
        out.push_str(&format!(
            "\nexport const {name} = {sig} => `{body}`;\n",
            name = message.name,
            sig = signature(message),
        ));
    }
    out
}

fn generate_locale_index(
    project: &ProjectFile,
    messages: &BTreeMap<String, CompiledMessage>,
) -> String {
    let mut out = String::from(GENERATED_HEADER);
    out.push_str("\nimport { getLocale } from \"./runtime.js\";\n");
    for locale in &project.locales {
        out.push_str(&format!(
            "import * as locale_{ident} from \"./messages/{locale}.js\";\n",
            ident = locale_ident(locale),
        ));
    }

    out.push_str("\nconst catalogs = {\n");
    for locale in &project.locales {
        out.push_str(&format!(
            "\t\"{locale}\": locale_{ident},\n",
            ident = locale_ident(locale),
        ));
    }
    out.push_str("};\n");

    for message in messages.values() {
        out.push_str(&format!(
            "\nexport const {name} = {sig} => catalogs[getLocale()].{name}{args};\n",
            name = message.name,
            sig = signature(message),
            args = call_args(message),
        ));
    }
    out
}

fn generate_message_module(project: &ProjectFile, message: &CompiledMessage) -> String {
    let mut out = String::from(GENERATED_HEADER);
    out.push_str("\nimport { getLocale } from \"../../runtime.js\";\n\n");

    for locale in &project.locales {
        let body = &message.bodies[locale];
        out.push_str(&format!(
            "const {ident} = {sig} => `{body}`;\n",
            ident = locale_ident(locale),
            sig = signature(message),
        ));
    }

    out.push_str(&format!(
        "\nexport const {name} = {sig} => {{\n\tswitch (getLocale()) {{\n",
        name = message.name,
        sig = signature(message),
    ));
    for locale in &project.locales {
        if locale == &project.base_locale {
            continue;
        }
        out.push_str(&format!(
            "\t\tcase \"{locale}\":\n\t\t\treturn {ident}{args};\n",
            ident = locale_ident(locale),
            args = call_args(message),
        ));
    }
    out.push_str(&format!(
        "\t\tdefault:\n\t\t\treturn {ident}{args};\n\t}}\n}};\n",
        ident = locale_ident(&project.base_locale),
        args = call_args(message),
    ));
    out
}

fn generate_message_index(messages: &BTreeMap<String, CompiledMessage>) -> String {
    let mut out = String::from(GENERATED_HEADER);
    out.push('\n');
    for message in messages.values() {
        out.push_str(&format!(
            "export {{ {name} }} from \"./messages/{name}/index.js\";\n",
            name = message.name,
        ));
    }
    out
}

fn generate_message_declarations(messages: &BTreeMap<String, CompiledMessage>) -> String {
    let mut out = String::from(GENERATED_HEADER);
    out.push('\n');
    for message in messages.values() {
        if message.params.is_empty() {
            out.push_str(&format!(
                "export declare const {}: () => string;\n",
                message.name
            ));
        } else {
            let fields = message
                .params
                .iter()
                .map(|p| format!("{p}: string"))
                .collect::<Vec<_>>()
                .join("; ");
            out.push_str(&format!(
                "export declare const {}: (params: {{ {fields} }}) => string;\n",
                message.name
            ));
        }
    }
    out
}

const RUNTIME_DECLARATIONS: &str = "// Generated by msgwatch. Do not edit.\n\n\
export declare const baseLocale: string;\n\
export declare const locales: readonly string[];\n\
export declare const strategy: readonly string[];\n\
export declare const getLocale: () => string;\n\
export declare const setLocale: (locale: string) => void;\n";

fn write_file(path: &Path, contents: &str, written: &mut BTreeSet<PathBuf>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    std::fs::write(path, contents)
        .with_context(|| format!("writing generated file {}", path.display()))?;
    written.insert(path.to_path_buf());
    Ok(())
}
