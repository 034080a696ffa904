use url::Url;

pub const DEFAULT_URL: &str = "ws://127.0.0.1:3000/ws";

/// Command line for the headless client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientOptions {
    /// Relay endpoint, checked to be a ws:// or wss:// URL
    pub url: String,
    /// Room to join; the relay generates a code when absent
    pub room: Option<String>,
    /// Stop after this many frames. 0 runs until killed.
    pub frames: u64,
    /// Disable local prediction of the guest's own car
    pub no_predict: bool,
    pub seed: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            room: None,
            frames: 0,
            no_predict: false,
            seed: 1,
        }
    }
}

impl ClientOptions {
    pub fn parse<I>(args: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut opts = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--url" => {
                    let raw = value(&mut args, "--url")?;
                    let parsed = Url::parse(&raw).map_err(|e| format!("--url {raw}: {e}"))?;
                    if !matches!(parsed.scheme(), "ws" | "wss") {
                        return Err(format!("--url must be ws:// or wss://, got {raw}"));
                    }
                    opts.url = raw;
                }
                "--room" => opts.room = Some(value(&mut args, "--room")?),
                "--frames" => {
                    let raw = value(&mut args, "--frames")?;
                    opts.frames = raw
                        .parse()
                        .map_err(|_| format!("--frames expects a number, got {raw}"))?;
                }
                "--seed" => {
                    let raw = value(&mut args, "--seed")?;
                    opts.seed = raw
                        .parse()
                        .map_err(|_| format!("--seed expects a number, got {raw}"))?;
                }
                "--no-predict" => opts.no_predict = true,
                other => return Err(format!("unknown argument {other}")),
            }
        }
        Ok(opts)
    }
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, String> {
    args.next().ok_or_else(|| format!("{flag} needs a value"))
}
