#![forbid(unsafe_code)]

//! sigill CLI: sign and verify XML-DSig documents.

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use sigill_core::{ns, Error};
use sigill_dsig::{DsigContext, Signature, UNSIGNED_PLACEHOLDER};
use sigill_keys::{loader, KeysManager, KeysManagerResolver};
use sigill_xml::XmlDocument;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sigill", about = "XML Digital Signature creation and verification", version)]
struct Cli {
    /// Log engine events (reference digests, key resolution) to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Key and document options shared by `sign` and `verify`.
#[derive(Args)]
struct KeyArgs {
    /// Load private/public key or certificate (PEM or DER, auto-detected)
    #[arg(short = 'k', long)]
    key: Option<PathBuf>,

    /// Load key with a name (NAME:FILE)
    #[arg(short = 'K', long = "key-name")]
    key_name: Vec<String>,

    /// Load raw HMAC key (binary file)
    #[arg(long = "hmac-key")]
    hmac_key: Option<PathBuf>,

    /// Register additional ID attribute names
    #[arg(long = "id-attr")]
    id_attr: Vec<String>,

    /// Register a namespaced ID attribute (LOCAL=NAMESPACE-URI)
    #[arg(long = "id-attr-ns")]
    id_attr_ns: Vec<String>,

    /// Only namespaced ID attributes and xml:id identify elements
    #[arg(long = "no-id-by-name")]
    no_id_by_name: bool,

    /// Map an external reference URL to a local file (URL=FILE)
    #[arg(long = "url-map")]
    url_map: Vec<String>,

    /// Directory that relative external reference URIs are read from
    #[arg(long = "base-dir")]
    base_dir: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a signed XML document
    Verify {
        /// Input XML file
        file: PathBuf,

        #[command(flatten)]
        keys: KeyArgs,

        /// Minimum accepted HMACOutputLength in bits (never below 80)
        #[arg(long = "hmac-min-bits", default_value_t = sigill_dsig::context::HMAC_MIN_OUTPUT_BITS)]
        hmac_min_bits: u32,
    },

    /// Sign an XML template
    Sign {
        /// Template XML file (with empty DigestValue/SignatureValue)
        template: PathBuf,

        #[command(flatten)]
        keys: KeyArgs,

        /// Hash manifest references before the references that point at them
        #[arg(long)]
        interlocking: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List supported algorithms and key types
    Info,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Verify {
            file,
            keys,
            hmac_min_bits,
        } => cmd_verify(&file, &keys, hmac_min_bits, cli.verbose),
        Commands::Sign {
            template,
            keys,
            interlocking,
            output,
        } => cmd_sign(&template, &keys, interlocking, output, cli.verbose),
        Commands::Info => cmd_info(),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

/// `RUST_LOG` wins; otherwise `warn`, or `debug` for the sigill crates with
/// `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,sigill=debug,sigill_dsig=debug,sigill_keys=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn cmd_verify(file: &Path, keys: &KeyArgs, hmac_min_bits: u32, verbose: bool) -> Result<bool, Error> {
    let xml = read_file(file)?;
    let mut ctx = build_context(keys, verbose)?;
    ctx.hmac_min_out_len = hmac_min_bits;
    let mgr = build_keys_manager(keys)?;

    tracing::info!(file = %file.display(), keys = mgr.len(), "verifying");
    let mut signature = Signature::parse(&xml, ctx)?;
    signature.set_key_info_resolver(Arc::new(KeysManagerResolver::new(mgr)));

    if signature.verify()? {
        println!("OK");
        return Ok(true);
    }
    println!("FAIL");
    for message in signature.error_messages() {
        eprintln!("  {message}");
    }
    Ok(false)
}

fn cmd_sign(
    template: &Path,
    keys: &KeyArgs,
    interlocking: bool,
    output: Option<PathBuf>,
    verbose: bool,
) -> Result<bool, Error> {
    let xml = read_file(template)?;
    let mut ctx = build_context(keys, verbose)?;
    ctx.interlocking = interlocking;
    let mgr = build_keys_manager(keys)?;
    let key = mgr.first_key()?.clone();

    tracing::info!(template = %template.display(), "signing");
    let mut doc = XmlDocument::parse(&xml)?;
    fill_empty_signature_value(&mut doc)?;
    let mut signature = Signature::find(doc, ctx)?;
    signature.load()?;
    signature.set_signing_key(key);
    signature.sign()?;

    write_output(output, signature.to_xml()?.as_bytes())?;
    Ok(true)
}

fn cmd_info() -> Result<bool, Error> {
    println!("sigill: XML Digital Signature in pure Rust");
    println!();
    println!("Digest algorithms:");
    println!("  SHA-1, SHA-224, SHA-256, SHA-384, SHA-512");
    println!("  SHA3-224, SHA3-256, SHA3-384, SHA3-512, MD5, RIPEMD-160");
    println!();
    println!("Signature algorithms:");
    println!("  RSA PKCS#1 v1.5 (SHA-1, SHA-224, SHA-256, SHA-384, SHA-512)");
    println!("  RSA-PSS (SHA-1, SHA-224, SHA-256, SHA-384, SHA-512, SHA3-256, SHA3-512)");
    println!("  ECDSA P-256/P-384 (SHA-1, SHA-224, SHA-256, SHA-384, SHA-512, SHA3-256, SHA3-384)");
    println!("  HMAC (SHA-1, SHA-224, SHA-256, SHA-384, SHA-512), HMACOutputLength >= 80 bits");
    println!();
    println!("Transforms:");
    println!("  C14N 1.0, C14N 1.1, Exclusive C14N 1.0 (each with or without comments)");
    println!("  Enveloped signature, Base64 decode, XPath (enveloped-signature filter)");
    println!("  XPath Filter 2.0 (intersect, subtract, union)");
    println!();
    println!("KeyInfo:");
    println!("  KeyName, KeyValue (RSA, DSA), X509Data, PGPData, SPKIData, MgmtData");
    println!();
    println!("Key formats:");
    println!("  PEM, DER (PKCS#8, PKCS#1, SEC1, SPKI, X.509), raw binary (HMAC)");
    Ok(true)
}

// ── Utility functions ────────────────────────────────────────────────

/// Templates usually carry an empty `<SignatureValue>`; give it the
/// placeholder text so the signature loads.
fn fill_empty_signature_value(doc: &mut XmlDocument) -> Result<(), Error> {
    let signature = doc
        .find_element(doc.root(), ns::DSIG, ns::node::SIGNATURE)
        .ok_or_else(|| Error::MissingElement(ns::node::SIGNATURE.into()))?;
    if let Some(value) = doc.find_child_element(signature, ns::DSIG, ns::node::SIGNATURE_VALUE) {
        if doc.text_content(value).trim().is_empty() {
            doc.set_text(value, UNSIGNED_PLACEHOLDER)?;
        }
    }
    Ok(())
}

fn build_context(keys: &KeyArgs, verbose: bool) -> Result<DsigContext, Error> {
    let mut ctx = DsigContext::new();
    ctx.debug = verbose;
    for attr in &keys.id_attr {
        ctx.add_id_attr(attr);
    }
    for spec in &keys.id_attr_ns {
        let (local, uri) = spec
            .split_once('=')
            .ok_or_else(|| Error::Other(format!("invalid id-attr-ns: {spec} (expected LOCAL=URI)")))?;
        ctx.add_id_attr_ns(uri, local);
    }
    ctx.id_by_attribute_name = !keys.no_id_by_name;
    for spec in &keys.url_map {
        let (url, file) = spec
            .split_once('=')
            .ok_or_else(|| Error::Other(format!("invalid url-map: {spec} (expected URL=FILE)")))?;
        ctx.add_url_map(url, file);
    }
    ctx.base_dir = keys.base_dir.clone();
    Ok(ctx)
}

fn build_keys_manager(keys: &KeyArgs) -> Result<KeysManager, Error> {
    let mut mgr = KeysManager::new();

    if let Some(path) = &keys.key {
        mgr.add_key(loader::load_key_file(path)?);
    }

    for spec in &keys.key_name {
        let (name, file) = spec
            .split_once(':')
            .ok_or_else(|| Error::Other(format!("invalid key-name format: {spec} (expected NAME:FILE)")))?;
        let key = if Path::new(file).extension().is_some_and(|ext| ext == "bin") {
            loader::load_hmac_key(&read_bytes(Path::new(file))?)
        } else {
            loader::load_key_file(Path::new(file))?
        };
        mgr.add_key(key.with_name(name));
    }

    if let Some(path) = &keys.hmac_key {
        mgr.add_key(loader::load_hmac_key(&read_bytes(path)?));
    }

    Ok(mgr)
}

fn read_file(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path).map_err(|e| Error::Other(format!("{}: {e}", path.display())))
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, Error> {
    std::fs::read(path).map_err(|e| Error::Other(format!("{}: {e}", path.display())))
}

fn write_output(path: Option<PathBuf>, data: &[u8]) -> Result<(), Error> {
    match path {
        Some(p) => std::fs::write(&p, data).map_err(|e| Error::Other(format!("{}: {e}", p.display()))),
        None => {
            use std::io::Write;
            std::io::stdout()
                .write_all(data)
                .map_err(|e| Error::Other(format!("stdout: {e}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_sign_flags() {
        let cli = Cli::try_parse_from([
            "sigill",
            "-v",
            "sign",
            "tmpl.xml",
            "--hmac-key",
            "k.bin",
            "--id-attr",
            "ID",
            "--interlocking",
            "-o",
            "out.xml",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Sign {
                keys,
                interlocking,
                output,
                ..
            } => {
                assert!(interlocking);
                assert_eq!(keys.id_attr, vec!["ID"]);
                assert_eq!(output, Some(PathBuf::from("out.xml")));
            }
            _ => panic!("expected sign"),
        }
    }

    #[test]
    fn test_bad_key_name_argument() {
        let keys = KeyArgs {
            key: None,
            key_name: vec!["nocolon".into()],
            hmac_key: None,
            id_attr: vec![],
            id_attr_ns: vec![],
            no_id_by_name: false,
            url_map: vec![],
            base_dir: None,
        };
        assert!(matches!(build_keys_manager(&keys), Err(Error::Other(_))));
    }

    #[test]
    fn test_namespaced_id_attr_argument() {
        let cli = Cli::try_parse_from([
            "sigill",
            "verify",
            "doc.xml",
            "--id-attr-ns",
            "ref=urn:w",
            "--no-id-by-name",
        ])
        .unwrap();
        let Commands::Verify { keys, .. } = cli.command else {
            panic!("expected verify");
        };
        let ctx = build_context(&keys, false).unwrap();
        assert_eq!(ctx.id_attrs_ns, vec![("urn:w".to_owned(), "ref".to_owned())]);
        assert!(!ctx.id_by_attribute_name);
    }

    #[test]
    fn test_fill_empty_signature_value() {
        let mut doc = XmlDocument::parse(
            r#"<r><Signature xmlns="http://www.w3.org/2000/09/xmldsig#"><SignedInfo/><SignatureValue/></Signature></r>"#,
        )
        .unwrap();
        fill_empty_signature_value(&mut doc).unwrap();
        assert!(doc.to_xml().unwrap().contains("<SignatureValue>Not yet signed</SignatureValue>"));

        let mut blank = XmlDocument::parse(
            "<Signature xmlns=\"http://www.w3.org/2000/09/xmldsig#\"><SignedInfo/><SignatureValue>\n  </SignatureValue></Signature>",
        )
        .unwrap();
        fill_empty_signature_value(&mut blank).unwrap();
        assert!(blank.to_xml().unwrap().contains("<SignatureValue>Not yet signed</SignatureValue>"));
    }
}
