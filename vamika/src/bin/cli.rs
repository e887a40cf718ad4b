//! Command-line interface for vamika.
//!
//! This binary talks to a running vamikad over its HTTP API.

use std::env;

use anyhow::{Result, bail};

use vamika::api_client::{
    self,
    types::{AlertPhase, NewContact, SosState},
};
use vamika::resources::dial_digits;

const USAGE: &str = "\
Usage: vamika-cli <command> [args]

Commands:
  status                              Show the signed-in user and SOS state
  sign-in <email> <password>          Sign in
  sign-out                            Sign out
  sos                                 Activate the SOS alert (again to cancel)
  cancel                              Cancel the SOS alert
  contacts                            List emergency contacts
  add-contact <name> <phone> [relation]
                                      Add an emergency contact
  incidents                           List reported incidents
  helplines                           List emergency helplines
  spots [query]                       List safe spots, optionally filtered

Environment:
  VAMIKA_API_URL    API base URL (default: http://127.0.0.1:7786)";

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();

    let Some(command) = args.first() else {
        eprintln!("{USAGE}");
        std::process::exit(1);
    };
    let rest = &args[1..];

    match (command.as_str(), rest) {
        ("status", []) => cmd_status().await?,
        ("sign-in", [email, password]) => cmd_sign_in(email, password).await?,
        ("sign-out", []) => cmd_sign_out().await?,
        ("sos", []) => cmd_sos().await?,
        ("cancel", []) => cmd_cancel().await?,
        ("contacts", []) => cmd_contacts().await?,
        ("add-contact", [name, phone]) => cmd_add_contact(name, phone, None).await?,
        ("add-contact", [name, phone, relation]) => {
            cmd_add_contact(name, phone, Some(relation)).await?
        }
        ("incidents", []) => cmd_incidents().await?,
        ("helplines", []) => cmd_helplines().await?,
        ("spots", []) => cmd_spots(None).await?,
        ("spots", [query]) => cmd_spots(Some(query)).await?,
        _ => {
            eprintln!("Unknown command or wrong arguments: {}", args.join(" "));
            eprintln!("Run without arguments to see usage.");
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Build an API client, honoring VAMIKA_API_URL if set.
fn make_client() -> api_client::Client {
    match env::var("VAMIKA_API_URL") {
        Ok(url) => api_client::Client::with_base_url(url),
        Err(_) => api_client::Client::new(),
    }
}

fn print_sos(state: &SosState) {
    match state.phase {
        AlertPhase::Idle => println!("SOS:     ready"),
        AlertPhase::Counting => println!(
            "SOS:     counting down, {} s until contacts are notified \
             (run `vamika-cli cancel` to stop)",
            state.remaining_ticks
        ),
        AlertPhase::Dispatched => println!("SOS:     dispatched, emergency contacts notified"),
    }
}

async fn cmd_status() -> Result<()> {
    let client = make_client();
    let user = client.get_profile().await?;
    let sos = client.get_sos().await?;

    println!("User:    {} <{}>", user.name, user.email);
    print_sos(&sos);
    Ok(())
}

async fn cmd_sign_in(email: &str, password: &str) -> Result<()> {
    let user = make_client().sign_in(email, password).await?;
    println!("Signed in as {}", user.name);
    Ok(())
}

async fn cmd_sign_out() -> Result<()> {
    make_client().sign_out().await?;
    println!("Signed out");
    Ok(())
}

async fn cmd_sos() -> Result<()> {
    let state = make_client().activate_sos().await?;
    match state.phase {
        AlertPhase::Idle => println!("SOS cancelled"),
        _ => print_sos(&state),
    }
    Ok(())
}

async fn cmd_cancel() -> Result<()> {
    let state = make_client().cancel_sos().await?;
    print_sos(&state);
    Ok(())
}

async fn cmd_contacts() -> Result<()> {
    let contacts = make_client().get_contacts().await?;
    if contacts.is_empty() {
        println!("Contacts: (none)");
        return Ok(());
    }

    println!("Contacts:");
    for contact in &contacts {
        if contact.relation.is_empty() {
            println!("  {:>3}  {} {}", contact.id, contact.name, contact.phone);
        } else {
            println!(
                "  {:>3}  {} ({}) {}",
                contact.id, contact.name, contact.relation, contact.phone
            );
        }
    }
    Ok(())
}

async fn cmd_add_contact(name: &str, phone: &str, relation: Option<&String>) -> Result<()> {
    let contact = NewContact {
        name: name.into(),
        phone: phone.into(),
        relation: relation.cloned().unwrap_or_default(),
    };
    let added = make_client().add_contact(&contact).await?;
    println!("Added contact {} ({})", added.name, added.id);
    Ok(())
}

async fn cmd_incidents() -> Result<()> {
    let incidents = make_client().get_incidents().await?;
    if incidents.is_empty() {
        println!("Incidents: (none)");
        return Ok(());
    }

    for incident in &incidents {
        println!(
            "{}  [{}] {} at {}, reported by {}",
            incident.date.date(),
            incident.kind,
            incident.title,
            incident.location,
            incident.reporter_name
        );
    }
    Ok(())
}

async fn cmd_helplines() -> Result<()> {
    for helpline in make_client().get_helplines().await? {
        println!("{}", helpline.name);
        println!("  {} (dial {})", helpline.phone, dial_digits(&helpline.phone));
        println!("  {}, {}", helpline.description, helpline.hours);
    }
    Ok(())
}

async fn cmd_spots(query: Option<&String>) -> Result<()> {
    let spots = make_client()
        .get_safe_spots(query.map(String::as_str))
        .await?;
    if spots.is_empty() {
        bail!("no safe spots match {:?}", query.map(String::as_str).unwrap_or_default());
    }

    for spot in &spots {
        println!(
            "{} ({}, {:.1}) {} away, {}",
            spot.name, spot.kind, spot.rating, spot.distance, spot.address
        );
    }
    Ok(())
}
