use std::{
    error::Error,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Mutex,
};

use clap::{Parser, Subcommand};

use soon::{
    ClientConfig, LocalStorage, LogInForm, NewPost, Post, PostId, SignUpForm, SoonClient, Trip,
    TripDraft, TripId, UserId, setup_logging,
};

/// A command line client for Soon, the social travel-sharing app.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The URL of the Soon backend. Overrides `SOON_BACKEND_URL`.
    #[arg(long)]
    backend_url: Option<String>,

    /// File path to the SQLite database that keeps the log-in session.
    #[arg(long, default_value = "soon.db")]
    storage_path: PathBuf,

    /// File path to write debug logs to.
    #[arg(long, default_value = "debug.log")]
    log_path: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in with an email and password.
    Login {
        #[arg(long)]
        email: String,
        /// Prompted for if omitted.
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account.
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long, default_value = "")]
        name: String,
        /// Prompted for if omitted.
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the log-in session.
    Logout,
    /// Show who is logged in.
    Whoami,
    /// Show the post feed.
    Feed {
        /// How many pages to load.
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// Share a post.
    Post {
        #[arg(long)]
        caption: Option<String>,
        #[arg(long)]
        location: Option<String>,
        /// Link to a photo. May be given more than once.
        #[arg(long = "image")]
        images: Vec<String>,
    },
    /// Like a post, or remove the like.
    Like { post_id: String },
    /// Show the comments on a post.
    Comments { post_id: String },
    /// Comment on a post.
    Comment { post_id: String, text: String },
    /// List community trips.
    Trips {
        /// How many pages to load.
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// Show a trip.
    Trip { trip_id: String },
    /// Join a trip.
    Join { trip_id: String },
    /// Host a trip, filling in the form step by step.
    Host,
    /// Show a user's profile, posts and trips.
    Profile { user_id: String },
    /// Follow a user, or unfollow them if already following.
    Follow { user_id: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(error) = setup_logging(&args.log_path) {
        eprintln!("Could not open the log file {:?}: {error}", args.log_path);
        return ExitCode::FAILURE;
    }

    let client = match create_client(args.backend_url.as_deref(), &args.storage_path) {
        Ok(client) => client,
        Err(error) => {
            eprintln!("Could not start: {error}");
            return ExitCode::FAILURE;
        }
    };

    let result = run(&client, args.command).await;
    print_notifications(&client);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::debug!("command failed: {error}");
            ExitCode::FAILURE
        }
    }
}

fn create_client(backend_url: Option<&str>, storage_path: &Path) -> Result<SoonClient, soon::Error> {
    let config = match backend_url {
        Some(url) => ClientConfig::from_env().with_backend_url(url),
        None => ClientConfig::from_env(),
    };
    let storage = LocalStorage::open(storage_path)?;

    SoonClient::new(config, storage)
}

async fn run(client: &SoonClient, command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Login { email, password } => {
            let password = password_or_prompt(password)?;
            let user = client.log_in(&LogInForm { email, password }).await?;
            println!("Logged in as @{}", user.username);
        }
        Command::Signup {
            email,
            username,
            name,
            password,
        } => {
            let password = password_or_prompt(password)?;
            let form = SignUpForm {
                email,
                password,
                username,
                name,
            };
            let user = client.sign_up(&form).await?;
            println!("Welcome to Soon, @{}", user.username);
        }
        Command::Logout => {
            client.log_out()?;
            println!("Logged out");
        }
        Command::Whoami => match client.session().user()? {
            Some(user) => println!("@{} ({})", user.username, user.id),
            None => println!("Not logged in"),
        },
        Command::Feed { pages } => {
            let feed = client.feed();
            for _ in 0..pages {
                feed.load().await?;
            }
            feed.items()?.iter().for_each(print_post);
            if feed.is_exhausted() {
                println!("You're all caught up");
            }
        }
        Command::Post {
            caption,
            location,
            images,
        } => {
            let posts = Mutex::new(Vec::new());
            let new_post = NewPost {
                caption,
                images,
                location,
            };
            let post = client.create_post(&posts, new_post, None).await?;
            println!("Shared post {}", post.id);
        }
        Command::Like { post_id } => {
            let post = client.post(&PostId::new(post_id)).await?;
            let posts = Mutex::new(vec![post.clone()]);
            let response = client.toggle_like(&posts, &post.id, None).await?;
            println!("{} likes", response.count);
        }
        Command::Comments { post_id } => {
            for comment in client.comments(&PostId::new(post_id)).await? {
                let author = comment.user.map(|user| user.username).unwrap_or_default();
                println!("@{author}: {}", comment.text);
            }
        }
        Command::Comment { post_id, text } => {
            let comments = Mutex::new(Vec::new());
            let comment = client
                .add_comment(&comments, &PostId::new(post_id), &text, None)
                .await?;
            println!("Commented ({})", comment.id);
        }
        Command::Trips { pages } => {
            let trips = client.trips();
            for _ in 0..pages {
                trips.load().await?;
            }
            trips.items()?.iter().for_each(print_trip);
        }
        Command::Trip { trip_id } => {
            print_trip(&client.trip(&TripId::new(trip_id)).await?);
        }
        Command::Join { trip_id } => {
            let trip = Mutex::new(client.trip(&TripId::new(trip_id)).await?);
            let response = client.join_trip(&trip, None).await?;
            println!("{:?}", response.status);
        }
        Command::Host => {
            let draft = fill_in_draft()?;
            let trip = client.create_trip(&draft).await?;
            println!("Hosting trip {}", trip.id);
        }
        Command::Profile { user_id } => {
            let user_id = UserId::new(user_id);
            let profile = client.profile(&user_id).await?;
            println!("{} (@{})", profile.user.display_name(), profile.user.username);
            if let Some(bio) = &profile.user.bio {
                println!("{bio}");
            }
            if profile.is_following {
                println!("Following");
            }

            client.user_posts(&user_id).await?.iter().for_each(print_post);
            let trips = client.user_trips(&user_id).await?;
            trips.hosted.iter().chain(&trips.joined).for_each(print_trip);
        }
        Command::Follow { user_id } => {
            let profile = client.profile(&UserId::new(user_id)).await?;
            if client.is_own_profile(&profile) {
                println!("You cannot follow yourself");
                return Ok(());
            }

            let profile = Mutex::new(profile);
            client.toggle_follow(&profile, None).await?;
            let profile = profile.into_inner().map_err(|_| soon::Error::LockError)?;
            if profile.is_following {
                println!("Following @{}", profile.user.username);
            } else {
                println!("Unfollowed @{}", profile.user.username);
            }
        }
    }

    Ok(())
}

fn print_post(post: &Post) {
    let author = post
        .user
        .as_ref()
        .map(|user| user.username.as_str())
        .unwrap_or("someone");

    println!(
        "[{}] @{author} at {}: {} ({} likes)",
        post.id,
        post.location.as_deref().unwrap_or("somewhere"),
        post.caption.as_deref().unwrap_or_default(),
        post.likes
    );
}

fn print_trip(trip: &Trip) {
    println!(
        "[{}] {} in {} {} ({} going{})",
        trip.id,
        trip.title.as_deref().unwrap_or("Untitled trip"),
        trip.location.as_deref().unwrap_or("somewhere"),
        trip.date_range().unwrap_or_default(),
        trip.joined_count,
        trip.capacity
            .map(|capacity| format!(", {capacity} spots"))
            .unwrap_or_default()
    );
}

fn print_notifications(client: &SoonClient) {
    for message in client.notifications().messages() {
        eprintln!("{message}");
    }
}

fn password_or_prompt(password: Option<String>) -> io::Result<String> {
    match password {
        Some(password) => Ok(password),
        None => rpassword::prompt_password("Password: "),
    }
}

fn fill_in_draft() -> io::Result<TripDraft> {
    let mut draft = TripDraft::default();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut ask = |label: &str| -> io::Result<String> {
        print!("{label}: ");
        io::stdout().flush()?;
        lines.next().unwrap_or(Ok(String::new()))
    };

    loop {
        match draft.step() {
            1 => {
                draft.title = ask("Title")?;
                draft.location = ask("Location")?;
                draft.cover_image = ask("Cover image URL")?;
            }
            2 => {
                draft.start_date = ask("Start date (YYYY-MM-DD)")?;
                draft.end_date = ask("End date (YYYY-MM-DD)")?;
                draft.capacity = ask("Capacity")?;
                draft.price = ask("Price (optional)")?;
            }
            _ => {
                draft.description = ask("Description")?;
            }
        }

        if draft.is_last_step() {
            return Ok(draft);
        }
        draft.next();
    }
}
