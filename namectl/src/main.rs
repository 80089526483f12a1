use std::cell::RefCell;
use std::{fs, io};
use std::io::Read;
use std::path::PathBuf;
use atty::Stream;
use clap::{Parser, Subcommand};
use k256::ecdsa::SigningKey;
use log::debug;
use nameops::keys::{parse_public_key, KeyAddress};
use nameops::ops::{AnnounceFields, PreorderFields, UpdateFields};
use nameops::wire::Frame;
use nameops::{
    AssembleError, Assembler, Announce, Broadcaster, FeePolicy, FundingMode, InputSource, NamePreorder, NameUpdate,
    Opcode, Operation, OperationRequest, ProtocolConfig, Registry, TxInput, TxOutput,
};
use rand_core::OsRng;

#[derive(Parser)]
#[command(bin_name = "namectl", author, version, about, long_about = None)]
struct Cli {
    /// Protocol config (JSON); mainnet defaults when absent
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Key utilities
    #[command(name = "key", subcommand)]
    Key(KeyCommands),

    /// Build a framed null-data payload
    #[command(name = "build", subcommand)]
    Build(BuildCommands),

    /// Parse a framed null-data payload
    #[command(name = "parse")]
    Parse { payload: Option<String> },

    /// Lay out the outputs around a payload
    #[command(name = "outputs")]
    Outputs(OutputsArgs),

    /// Validate an observed output list and print its fees
    #[command(name = "fees")]
    Fees(FeesArgs),

    /// Assemble a full transaction from a request and a list of inputs
    #[command(name = "assemble", subcommand)]
    Assemble(AssembleCommands),
}

#[derive(Subcommand)]
enum KeyCommands {
    /// Generates a new private key
    #[command(name = "gen")]
    GenKey {
        #[arg(short = 'C')]
        c: Option<String>,
    },

    /// Prints the public key and address of a private key
    #[command(name = "inspect")]
    InspectKey { path: String },
}

#[derive(Subcommand)]
enum BuildCommands {
    #[command(name = "announce")]
    Announce { message_hash: String },

    #[command(name = "preorder")]
    Preorder {
        name: String,
        consensus_hash: String,

        /// Private key file of the future owner
        #[arg(short = 'k', long, conflicts_with_all = ["public_key", "name_hash"])]
        private_key: Option<String>,

        /// Hex public key of the future owner
        #[arg(long, conflicts_with = "name_hash")]
        public_key: Option<String>,

        #[arg(long)]
        register_addr: Option<String>,

        /// Precomputed preorder hash
        #[arg(long)]
        name_hash: Option<String>,
    },

    #[command(name = "update")]
    Update {
        name: String,
        consensus_hash: String,
        data_hash: String,
    },
}

#[derive(Subcommand)]
enum AssembleCommands {
    #[command(name = "announce")]
    Announce {
        message_hash: String,

        #[command(flatten)]
        funding: FundingArgs,
    },

    #[command(name = "preorder")]
    Preorder {
        name: String,
        consensus_hash: String,

        #[arg(long)]
        register_addr: Option<String>,

        /// Operation fee to burn
        #[arg(long, default_value_t = 0)]
        fee: u64,

        #[command(flatten)]
        funding: FundingArgs,
    },

    #[command(name = "update")]
    Update {
        name: String,
        consensus_hash: String,
        data_hash: String,

        #[command(flatten)]
        funding: FundingArgs,
    },
}

impl AssembleCommands {
    fn into_parts(self) -> (OperationRequest, FundingArgs) {
        match self {
            AssembleCommands::Announce { message_hash, funding } => {
                (OperationRequest::Announce { message_hash }, funding)
            }
            AssembleCommands::Preorder { name, consensus_hash, register_addr, fee, funding } => {
                (OperationRequest::Preorder { name, register_addr, consensus_hash, fee }, funding)
            }
            AssembleCommands::Update { name, consensus_hash, data_hash, funding } => {
                (OperationRequest::Update { name, data_hash, consensus_hash }, funding)
            }
        }
    }
}

#[derive(clap::Args)]
struct FundingArgs {
    /// Private key file of the paying key
    #[arg(short = 'k', long)]
    private_key: Option<String>,

    /// Hex public key of a subsidized principal; the transaction is left unsigned
    #[arg(long)]
    public_key: Option<String>,

    /// JSON list of spendable inputs; read from stdin when absent
    #[arg(short, long)]
    inputs: Option<String>,

    /// Sign with the private key instead of printing the unsigned transaction
    #[arg(long)]
    sign: bool,
}

/// Inputs listed up front rather than looked up per address.
struct ListedInputs(Vec<TxInput>);

impl InputSource for ListedInputs {
    fn get_spendable_inputs(&self, address: &str) -> Result<Vec<TxInput>, AssembleError> {
        debug!("Using {} listed inputs for {}", self.0.len(), address);
        Ok(self.0.clone())
    }
}

/// Keeps the signed bytes so they are printed instead of relayed.
#[derive(Default)]
struct SignedTx(RefCell<Option<Vec<u8>>>);

impl Broadcaster for SignedTx {
    fn broadcast(&self, signed_tx: &[u8]) -> Result<String, AssembleError> {
        self.0.replace(Some(signed_tx.to_vec()));
        Ok(nameops::tx::txid(signed_tx))
    }
}

#[derive(clap::Args)]
struct OutputsArgs {
    /// Framed payload hex
    payload: String,

    /// JSON list of spendable inputs; read from stdin when absent
    #[arg(short, long)]
    inputs: Option<String>,

    #[arg(long)]
    change: String,

    /// Operation fee to burn (NAME_PREORDER only)
    #[arg(long, default_value_t = 0)]
    fee: u64,

    #[arg(long)]
    subsidized: bool,
}

#[derive(clap::Args)]
struct FeesArgs {
    /// JSON list of observed outputs; read from stdin when absent
    #[arg(short, long)]
    outputs: Option<String>,

    #[arg(short = 'n', long)]
    inputs_count: usize,
}

fn other<E: Into<Box<dyn std::error::Error + Send + Sync>>>(e: E) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e)
}

fn invalid<E: Into<Box<dyn std::error::Error + Send + Sync>>>(e: E) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, e)
}

fn load_config(path: &Option<PathBuf>) -> Result<ProtocolConfig, io::Error> {
    match path {
        Some(path) => {
            let json = fs::read(path)?;
            ProtocolConfig::from_json(&json).map_err(invalid)
        }
        None => Ok(ProtocolConfig::default()),
    }
}

fn read_input(arg: Option<String>, what: &str) -> Result<String, io::Error> {
    if let Some(arg) = arg {
        return Ok(arg);
    }
    if atty::is(Stream::Stdin) {
        return Err(io::Error::new(io::ErrorKind::InvalidData, format!("{} not provided", what)));
    }
    let mut input = String::new();
    io::stdin().read_to_string(&mut input).map_err(|_e| {
        io::Error::new(io::ErrorKind::InvalidData, format!("{} not provided", what))
    })?;
    Ok(input.trim().to_string())
}

/// JSON from a file path, or from stdin when no path is given.
fn read_json<T: serde::de::DeserializeOwned>(path: Option<String>, what: &str) -> Result<T, io::Error> {
    let json = match path {
        Some(path) => fs::read_to_string(path)?,
        None => read_input(None, what)?,
    };
    serde_json::from_str(&json).map_err(invalid)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), io::Error> {
    let str = serde_json::to_string_pretty(value).map_err(other)?;
    println!("{}", str);
    Ok(())
}

fn build(config: &ProtocolConfig, cmd: BuildCommands) -> Result<(), io::Error> {
    let payload = match cmd {
        BuildCommands::Announce { message_hash } => {
            Announce::build(config, &AnnounceFields { message_hash })
        }
        BuildCommands::Preorder { name, consensus_hash, private_key, public_key, register_addr, name_hash } => {
            let script_pubkey = match (private_key, public_key) {
                (Some(path), _) => load_signing_key(&path)?.script_pubkey(),
                (None, Some(public_key)) => parse_public_key(&public_key).map_err(invalid)?.script_pubkey(),
                (None, None) if name_hash.is_some() => Vec::new(),
                (None, None) => return Err(invalid("missing both public and private key")),
            };
            NamePreorder::build(config, &PreorderFields {
                name,
                script_pubkey,
                register_addr,
                consensus_hash,
                name_hash,
            })
        }
        BuildCommands::Update { name, consensus_hash, data_hash } => {
            NameUpdate::build(config, &UpdateFields { name, consensus_hash, data_hash })
        }
    }.map_err(invalid)?;

    println!("{}", hex::encode(payload));
    Ok(())
}

fn parse(config: &ProtocolConfig, payload: Option<String>) -> Result<(), io::Error> {
    let payload = read_input(payload, "payload")?;
    let nulldata = hex::decode(payload.trim()).map_err(invalid)?;
    let record = Registry::standard().parse_nulldata(config, &nulldata).map_err(invalid)?;
    print_json(&record)
}

fn outputs(config: &ProtocolConfig, args: OutputsArgs) -> Result<(), io::Error> {
    let payload = hex::decode(args.payload.trim()).map_err(invalid)?;
    let opcode = Frame::new(config, &payload)
        .map_err(invalid)?
        .opcode()
        .ok_or_else(|| invalid("unknown opcode"))?;
    let inputs: Vec<TxInput> = read_json(args.inputs, "inputs")?;

    let policy = if args.subsidized { FeePolicy::subsidized() } else { FeePolicy::paid() };
    let policy = policy.with_fee(args.fee);
    debug!("{} outputs for {} inputs ({:?})", opcode, inputs.len(), policy);

    let outputs = match opcode {
        Opcode::Announce => Announce::make_outputs(config, &payload, &inputs, &args.change, policy),
        Opcode::NamePreorder => NamePreorder::make_outputs(config, &payload, &inputs, &args.change, policy),
        Opcode::NameUpdate => NameUpdate::make_outputs(config, &payload, &inputs, &args.change, policy),
    }.map_err(invalid)?;

    print_json(&outputs)
}

fn fees(config: &ProtocolConfig, args: FeesArgs) -> Result<(), io::Error> {
    let outputs: Vec<TxOutput> = read_json(args.outputs, "outputs")?;
    match Registry::standard().check_outputs(config, args.inputs_count, &outputs) {
        Some((record, quote)) => print_json(&serde_json::json!({
            "record": record,
            "dust_fee": quote.dust_fee,
            "op_fee": quote.op_fee,
        })),
        None => Err(invalid("transaction does not conform to the protocol")),
    }
}

fn load_funding(args: &FundingArgs) -> Result<FundingMode, io::Error> {
    let private_key = args.private_key.as_deref().map(load_signing_key).transpose()?;
    let public_key = args.public_key.as_deref().map(parse_public_key).transpose().map_err(invalid)?;
    FundingMode::from_keys(private_key, public_key).map_err(invalid)
}

fn assemble_outcome(
    config: &ProtocolConfig,
    request: &OperationRequest,
    funding: &FundingMode,
    inputs: Vec<TxInput>,
    sign: bool,
) -> Result<serde_json::Value, io::Error> {
    let assembler = Assembler::new(config, ListedInputs(inputs));
    let signed = SignedTx::default();
    let outcome = assembler.broadcast(request, funding, &signed, !sign).map_err(invalid)?;

    let mut value = serde_json::to_value(&outcome).map_err(other)?;
    if let Some(raw) = signed.0.take() {
        value["signed_tx"] = hex::encode(raw).into();
    }
    Ok(value)
}

fn assemble(config: &ProtocolConfig, cmd: AssembleCommands) -> Result<(), io::Error> {
    let (request, args) = cmd.into_parts();
    let funding = load_funding(&args)?;
    let inputs: Vec<TxInput> = read_json(args.inputs, "inputs")?;
    let value = assemble_outcome(config, &request, &funding, inputs, args.sign)?;
    print_json(&value)
}

fn run() -> Result<(), io::Error> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    match cli.command {
        Commands::Build(cmd) => {
            build(&config, cmd)
        },
        Commands::Parse { payload } => {
            parse(&config, payload)
        },
        Commands::Outputs(args) => {
            outputs(&config, args)
        },
        Commands::Fees(args) => {
            fees(&config, args)
        },
        Commands::Assemble(cmd) => {
            assemble(&config, cmd)
        },
        Commands::Key(args) => {
           match args {
               KeyCommands::GenKey{c} => {
                gen_key(&config, c)
               },
               KeyCommands::InspectKey { path } => {
                inspect_key(&config, path)
               }
           }
        }
    }
}

fn inspect_key(config: &ProtocolConfig, path: String) -> Result<(), io::Error> {
    let key = load_signing_key(&path)?;
    println!("Public key: {}", key.public_key_hex());
    println!("Address: {}", key.address(config));
    Ok(())
}

fn gen_key(config: &ProtocolConfig, c: Option<String>) -> Result<(), io::Error> {
    let key = SigningKey::random(&mut OsRng);
    let pub_key_hex = key.public_key_hex();
    let path = get_working_dir(&c)?.join(format!("k-{}.priv", &pub_key_hex[2..10]));
    fs::write(&path, key.to_bytes()).map_err(other)?;

    println!("Generated {}", path.display());
    println!("Public key: {}", pub_key_hex);
    println!("Address: {}", key.address(config));
    Ok(())
}

fn get_working_dir(c : &Option<String>) -> Result<PathBuf, io::Error> {
    let mut path_prefix = PathBuf::new();
    if let Some(output) = c {
        path_prefix.push(output);
        if !path_prefix.exists() {
            fs::create_dir_all(&path_prefix)?;
        }

        let metadata = fs::metadata(&path_prefix)?;
        if !metadata.is_dir() {
            return Err(io::Error::new(io::ErrorKind::Other, "Path is not a directory"));
        }
    } else {
        path_prefix.push(".");
    }
    Ok(path_prefix)
}

fn load_signing_key(path: &str) -> Result<SigningKey, io::Error> {
    let key = fs::read(path).map_err(|e| {
        io::Error::new(io::ErrorKind::NotFound, format!("Private key not found at {}: {}", path, e))
    })?;
    SigningKey::from_slice(key.as_slice()).map_err(|_e| {
        io::Error::new(io::ErrorKind::InvalidData, "Invalid private key")
    })
}

fn main() {
    env_logger::init();
    run().unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::exit(1);
    });
}
