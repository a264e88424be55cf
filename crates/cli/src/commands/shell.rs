//! Interactive checkout shell.

use std::fmt::Display;
use std::io::{self, BufRead, Write};

use larder_checkout::{AssumeYes, CheckoutError, Confirm, ConfirmPrompt, OrderForm};
use larder_core::{DeliveryMethod, PaymentMethod, ProductId};
use thiserror::Error;

use super::{Session, flush_notices, render};

const HELP: &str = "\
Commands:
  cart                      show the cart (refreshed from the store)
  add <id> [qty]            add a product
  set <id> <qty>            change a quantity
  remove <id>               remove a product
  clear                     empty the cart
  delivery <method> [city]  price delivery (courier, pickup)
  payment <method>          choose payment (cash, card_online, card_courier, sbp)
  status                    show checkout phase and totals
  checkout                  fill in the order form and place the order
  reload                    start over from the stored state
  help                      show this help
  quit                      leave the shell";

/// Errors that end a shell command.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("{0}")]
    Usage(&'static str),
    #[error(transparent)]
    Checkout(#[from] CheckoutError),
    #[error("Terminal error: {0}")]
    Io(#[from] io::Error),
}

/// Asks on the terminal; anything but `y`/`yes` declines.
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &ConfirmPrompt) -> bool {
        match read_line(&format!("{prompt} [y/N] ")) {
            Ok(Some(answer)) => matches!(answer.to_lowercase().as_str(), "y" | "yes"),
            Ok(None) => false,
            Err(err) => {
                tracing::warn!(error = %err, "Could not read confirmation");
                false
            }
        }
    }
}

/// Run the shell until `quit` or end of input.
///
/// # Errors
///
/// Returns an error only if the terminal cannot be read or written.
pub async fn run(session: &Session, assume_yes: bool) -> Result<(), ShellError> {
    let confirm: &dyn Confirm = if assume_yes { &AssumeYes } else { &StdinConfirm };
    let mut events = session.subscribe();

    say(HELP);
    let mut pending = Some(String::from("cart"));

    loop {
        let line = match pending.take() {
            Some(line) => line,
            None => {
                flush_notices(&mut events);
                match read_line(&format!("{} > ", session.phase()))? {
                    Some(line) => line,
                    None => break,
                }
            }
        };

        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = words.split_first() else {
            continue;
        };
        if matches!(command, "quit" | "exit") {
            break;
        }

        match execute(session, confirm, command, args).await {
            Ok(()) => {}
            Err(ShellError::Checkout(err)) => render::error(&err),
            Err(ShellError::Usage(usage)) => say(usage),
            Err(err @ ShellError::Io(_)) => return Err(err),
        }
    }

    flush_notices(&mut events);
    Ok(())
}

async fn execute(
    session: &Session,
    confirm: &dyn Confirm,
    command: &str,
    args: &[&str],
) -> Result<(), ShellError> {
    match (command, args) {
        ("help", _) => say(HELP),
        ("cart", []) => render::cart(&session.fetch_cart().await?),
        ("add", [id]) => render::cart(&session.add_to_cart(parse_id(id)?, 1).await?),
        ("add", [id, quantity]) => {
            let cart = session
                .add_to_cart(parse_id(id)?, parse_quantity(quantity)?)
                .await?;
            render::cart(&cart);
        }
        ("set", [id, quantity]) => {
            let cart = session
                .mutate_cart_item(parse_id(id)?, parse_quantity(quantity)?)
                .await?;
            render::cart(&cart);
        }
        ("remove", [id]) => {
            if let Some(cart) = session.remove_cart_item(parse_id(id)?, confirm).await? {
                render::cart(&cart);
            }
        }
        ("clear", []) => {
            if let Some(cart) = session.clear_cart(confirm).await? {
                render::cart(&cart);
            }
        }
        ("delivery", [method, city @ ..]) => {
            let method: DeliveryMethod = method
                .parse()
                .map_err(|_| ShellError::Usage("Delivery method is `courier` or `pickup`"))?;
            let selection = session
                .compute_delivery_cost(&city.join(" "), method)
                .await?;
            render::delivery(&selection);
            render::totals(&session.totals());
        }
        ("payment", [method]) => {
            let method: PaymentMethod = method.parse().map_err(|_| {
                ShellError::Usage("Payment method is `cash`, `card_online`, `card_courier` or `sbp`")
            })?;
            session.set_payment_method(method)?;
            say(format!("Payment: {}", method.label()));
        }
        ("status", []) => {
            say(format!("Checkout: {}", session.phase()));
            render::totals(&session.totals());
        }
        ("checkout", []) => checkout(session, confirm).await?,
        ("reload", []) => render::cart(&session.reload().await?),
        ("add", _) => return Err(ShellError::Usage("Usage: add <id> [qty]")),
        ("set", _) => return Err(ShellError::Usage("Usage: set <id> <qty>")),
        ("remove", _) => return Err(ShellError::Usage("Usage: remove <id>")),
        ("delivery", _) => return Err(ShellError::Usage("Usage: delivery <method> [city]")),
        ("payment", _) => return Err(ShellError::Usage("Usage: payment <method>")),
        _ => return Err(ShellError::Usage("Unknown command, type `help`")),
    }
    Ok(())
}

/// Collect the order form, show the draft and place the order.
async fn checkout(session: &Session, confirm: &dyn Confirm) -> Result<(), ShellError> {
    let delivery = session
        .delivery()
        .ok_or(CheckoutError::DeliveryNotComputed)?;
    let needs_address = delivery.method.requires_address();

    let mut form = OrderForm {
        city: delivery.city.clone(),
        ..OrderForm::default()
    };
    session.prefill_form(&mut form).await;

    if needs_address {
        let addresses = session.saved_addresses().await;
        if !addresses.is_empty() {
            render::addresses(&addresses);
            let choice = read_line("Saved address number (blank to type one): ")?;
            if let Some(choice) = choice.filter(|c| !c.is_empty()) {
                let address = choice
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| addresses.get(i))
                    .ok_or(ShellError::Usage("No such saved address"))?;
                form.apply_address(address);
            }
        }
    }

    for (label, value) in [
        ("First name", &mut form.first_name),
        ("Last name", &mut form.last_name),
        ("Email", &mut form.email),
        ("Phone", &mut form.phone),
    ] {
        ask(label, value)?;
    }
    if needs_address {
        for (label, value) in [
            ("City", &mut form.city),
            ("Address", &mut form.address),
            ("Postal code", &mut form.postal_code),
        ] {
            ask(label, value)?;
        }
    }
    ask("Notes", &mut form.notes)?;

    let draft = session.build_order_draft(&form)?;
    render::draft(&draft);

    if !confirm.confirm(&ConfirmPrompt::PlaceOrder { total: draft.total }) {
        say("Order not placed.");
        return Ok(());
    }

    let confirmation = session.submit_order(&draft).await?;
    render::confirmation(&confirmation);
    Ok(())
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Prompt and read one trimmed line. `None` at end of input.
fn read_line(prompt: &str) -> io::Result<Option<String>> {
    tokio::task::block_in_place(|| {
        let mut stdout = io::stdout().lock();
        write!(stdout, "{prompt}")?;
        stdout.flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    })
}

/// Ask for a field, keeping the current value on a blank answer.
fn ask(label: &str, value: &mut String) -> io::Result<()> {
    let prompt = if value.is_empty() {
        format!("{label}: ")
    } else {
        format!("{label} [{value}]: ")
    };
    if let Some(answer) = read_line(&prompt)?.filter(|a| !a.is_empty()) {
        *value = answer;
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn say(message: impl Display) {
    println!("{message}");
}

fn parse_id(raw: &str) -> Result<ProductId, ShellError> {
    raw.parse()
        .map_err(|_| ShellError::Usage("Product id must be a number"))
}

fn parse_quantity(raw: &str) -> Result<u32, ShellError> {
    raw.parse()
        .map_err(|_| ShellError::Usage("Quantity must be a whole number"))
}
