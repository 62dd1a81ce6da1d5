#![forbid(unsafe_code)]

//! samling CLI: inspect, sign and verify SAML documents.

use clap::{Parser, Subcommand};
use samling::{default_registry, default_signature_algorithm, unmarshall_str};
use samling_core::{algorithm, Error};
use samling_dsig::{sign_object, KeyInfo, Signature, SigningContext};
use samling_keys::loader::{load_certificates_file, load_key_file};
use samling_security::{
    BasicX509SignatureTrustEngine, PkixSignatureTrustEngine, PkixValidationInformation,
    SignatureTrustEngine, StaticKeyInfoSource, StaticPkixValidationInformationResolver,
    X509Credential,
};
use samling_xmlobject::{UnmarshallingPolicy, XmlHandle, XmlObject, XmlObjectRef};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "samling",
    about = "SAML 1.x/2.0 documents as typed objects, with XML signatures",
    version
)]
struct Cli {
    /// Log trust and signing decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Unmarshall a document and print its typed tree
    Inspect {
        /// Input XML file
        file: PathBuf,

        /// Skip elements and attributes no provider knows
        #[arg(long)]
        ignore_unknown: bool,
    },

    /// Sign the document element of a SAML document
    Sign {
        /// Input XML file
        file: PathBuf,

        /// Private key (PEM or DER)
        #[arg(short = 'k', long)]
        key: PathBuf,

        /// Certificate chain to embed in KeyInfo (PEM)
        #[arg(long)]
        cert: Option<PathBuf>,

        /// Signature algorithm URI (default: chosen from the key type)
        #[arg(long)]
        algorithm: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify the signature on the document element
    Verify {
        /// Input XML file
        file: PathBuf,

        /// Trust exactly this signer certificate (PEM)
        #[arg(long, conflicts_with = "trusted", required_unless_present = "trusted")]
        cert: Option<PathBuf>,

        /// Trust anchors for path validation (PEM); the key comes from the
        /// document's KeyInfo
        #[arg(long)]
        trusted: Vec<PathBuf>,

        /// Skip elements and attributes no provider knows
        #[arg(long)]
        ignore_unknown: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Inspect {
            file,
            ignore_unknown,
        } => cmd_inspect(&file, ignore_unknown),
        Commands::Sign {
            file,
            key,
            cert,
            algorithm,
            output,
        } => cmd_sign(&file, &key, cert.as_deref(), algorithm, output.as_deref()),
        Commands::Verify {
            file,
            cert,
            trusted,
            ignore_unknown,
        } => cmd_verify(&file, cert.as_deref(), &trusted, ignore_unknown),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(2);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn policy(ignore_unknown: bool) -> UnmarshallingPolicy {
    if ignore_unknown {
        UnmarshallingPolicy::lenient()
    } else {
        UnmarshallingPolicy::strict()
    }
}

fn cmd_inspect(file: &Path, ignore_unknown: bool) -> Result<bool, Error> {
    let registry = default_registry();
    let root = unmarshall_str(&registry, &read_file(file)?, policy(ignore_unknown))?;
    print_tree(&root, 0)?;
    Ok(true)
}

fn print_tree(node: &XmlObjectRef, depth: usize) -> Result<(), Error> {
    let object = node.try_borrow()?;
    let mut line = format!("{:indent$}{}", "", node.element_name(), indent = depth * 2);
    if let Some(schema_type) = object.base().schema_type() {
        line.push_str(&format!(" xsi:type={schema_type}"));
    }
    if let Some(signable) = object.as_signable() {
        let id = signable.signature_reference_id().unwrap_or_default();
        let state = if signable.is_signed() { "signed" } else { "unsigned" };
        line.push_str(&format!(" [id={id:?}, {state}]"));
    }
    println!("{line}");
    for child in object.ordered_children() {
        print_tree(&child, depth + 1)?;
    }
    Ok(())
}

fn cmd_sign(
    file: &Path,
    key_path: &Path,
    cert_path: Option<&Path>,
    algorithm_uri: Option<String>,
    output: Option<&Path>,
) -> Result<bool, Error> {
    let registry = default_registry();
    let root = unmarshall_str(&registry, &read_file(file)?, UnmarshallingPolicy::strict())?;

    let mut key = load_key_file(key_path)?;
    if let Some(path) = cert_path {
        key = key.with_certificates(load_certificates_file(path)?);
    }
    let signature_algorithm =
        algorithm_uri.unwrap_or_else(|| default_signature_algorithm(&key).to_owned());
    let context = SigningContext::new()
        .with_signature_algorithm(signature_algorithm)
        .with_digest_algorithm(algorithm::SHA256)
        .with_signing_key(key);
    let signature = Signature::new(context)?;

    {
        let mut object = root.try_borrow_mut()?;
        let signable = object.as_signable_mut().ok_or_else(|| {
            Error::IllegalState(format!("{} cannot carry a signature", root.element_name()))
        })?;
        signable.set_signature(Some(signature.erase()))?;
    }
    let element = registry.marshall(&root)?;
    sign_object(&signature)?;
    tracing::debug!(element = %root.element_name(), "signed document");

    let xml = samling_xml::writer::to_document_string(&element);
    match output {
        Some(path) => std::fs::write(path, xml)?,
        None => println!("{xml}"),
    }
    Ok(true)
}

fn cmd_verify(
    file: &Path,
    cert_path: Option<&Path>,
    trusted: &[PathBuf],
    ignore_unknown: bool,
) -> Result<bool, Error> {
    let registry = default_registry();
    let root = unmarshall_str(&registry, &read_file(file)?, policy(ignore_unknown))?;
    let signature = root_signature(&root)?;

    let valid = match cert_path {
        Some(path) => {
            let credential = X509Credential::new().with_certificates(load_certificates_file(path)?);
            BasicX509SignatureTrustEngine::new().validate(&signature, &credential)?
        }
        None => {
            let mut anchors = Vec::new();
            for path in trusted {
                anchors.extend(load_certificates_file(path)?);
            }
            let engine = PkixSignatureTrustEngine::new(StaticPkixValidationInformationResolver::new(
                vec![PkixValidationInformation::new(anchors)],
            ));
            let key_infos: Vec<XmlHandle<KeyInfo>> =
                signature.borrow().key_info().cloned().into_iter().collect();
            let source = StaticKeyInfoSource::new(None, key_infos);
            engine.validate(&signature, &source)?
        }
    };

    if valid {
        println!("OK");
    } else {
        println!("INVALID");
    }
    Ok(valid)
}

fn root_signature(root: &XmlObjectRef) -> Result<XmlHandle<Signature>, Error> {
    let object = root.try_borrow()?;
    let signable = object.as_signable().ok_or_else(|| {
        Error::IllegalState(format!("{} cannot carry a signature", root.element_name()))
    })?;
    signable
        .signature()
        .and_then(|s| s.downcast::<Signature>())
        .ok_or_else(|| Error::MissingElement("Signature".into()))
}

fn read_file(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path).map_err(|e| Error::Other(format!("{}: {e}", path.display())))
}
