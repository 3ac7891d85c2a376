//! Interactive numbered-menu loop.
//!
//! # Responsibility
//! - Read operator choices and field values line by line.
//! - Dispatch to `UserService` and print outcomes.
//!
//! # Invariants
//! - Input, validation, not-found and store failures are printed and the loop
//!   continues.
//! - Console I/O failures end the loop and propagate.
//! - End of input behaves like the exit choice.

use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{self, BufRead, Write};
use std::str::FromStr;
use usermgr_core::{ServiceError, User, UserId, UserRepository, UserService, ValidationError};

const MENU: &str = "
USER_SERVICE
1. Create user
2. Find user by ID
3. Show all users
4. Update user
5. Delete user
0. Exit
";

#[derive(Debug)]
enum MenuError {
    Io(io::Error),
    EndOfInput,
    /// Line was not valid UTF-8.
    InvalidInput,
    InvalidNumber(String),
    /// Blank answer to a prompt that has no default.
    MissingValue(&'static str),
    Service(ServiceError),
}

impl Display for MenuError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::EndOfInput => write!(f, "end of input"),
            Self::InvalidInput => write!(f, "input is not valid UTF-8"),
            Self::InvalidNumber(raw) => write!(f, "invalid number: `{raw}`"),
            Self::MissingValue(field) => write!(f, "{field} is required"),
            Self::Service(err) => write!(f, "{err}"),
        }
    }
}

impl Error for MenuError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Service(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for MenuError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<ServiceError> for MenuError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

type MenuResult<T> = Result<T, MenuError>;

/// Console front-end over a `UserService`.
pub struct UserMenu<In, Out, Repo: UserRepository> {
    input: In,
    output: Out,
    service: UserService<Repo>,
}

impl<In: BufRead, Out: Write, Repo: UserRepository> UserMenu<In, Out, Repo> {
    pub fn new(input: In, output: Out, service: UserService<Repo>) -> Self {
        Self {
            input,
            output,
            service,
        }
    }

    /// Runs the loop until the exit choice or end of input.
    pub fn run(&mut self) -> io::Result<()> {
        loop {
            write!(self.output, "{MENU}")?;
            let choice = match self.prompt_number::<u32>("Choose an action: ") {
                Ok(Some(choice)) => choice,
                Ok(None) => continue,
                Err(MenuError::EndOfInput) => break,
                Err(err) => {
                    self.report("choose", err)?;
                    continue;
                }
            };

            let (action, outcome) = match choice {
                0 => break,
                1 => ("create", self.create_user()),
                2 => ("find", self.find_user_by_id()),
                3 => ("list", self.show_all_users()),
                4 => ("update", self.update_user()),
                5 => ("delete", self.delete_user()),
                _ => {
                    writeln!(self.output, "Unknown choice, try again.")?;
                    continue;
                }
            };

            match outcome {
                Ok(()) => info!("event=menu_action module=cli status=ok action={action}"),
                Err(MenuError::EndOfInput) => break,
                Err(err) => self.report(action, err)?,
            }
        }

        writeln!(self.output, "Bye.")?;
        self.output.flush()?;
        info!("event=menu_exit module=cli status=ok");
        Ok(())
    }

    fn create_user(&mut self) -> MenuResult<()> {
        let name = self.prompt("Enter name: ")?;
        let email = self.prompt("Enter email: ")?;
        let age = self.require_number::<u32>("Enter age: ", "age")?;

        let mut user = User::new(name, email, age);
        self.service.save_user(&mut user)?;
        writeln!(
            self.output,
            "User {} created with id {}.",
            user.name,
            user.id.unwrap_or_default()
        )?;
        Ok(())
    }

    fn find_user_by_id(&mut self) -> MenuResult<()> {
        let id = self.prompt_number::<UserId>("User id to find: ")?;
        match self.service.get_user_by_id(id)? {
            Some(user) => writeln!(self.output, "Found {user}")?,
            None => writeln!(self.output, "User with id {} not found.", id.unwrap_or_default())?,
        }
        Ok(())
    }

    fn show_all_users(&mut self) -> MenuResult<()> {
        let users = self.service.get_all_users()?;
        if users.is_empty() {
            writeln!(self.output, "No users registered.")?;
            return Ok(());
        }

        writeln!(self.output, "Users:")?;
        for user in &users {
            writeln!(self.output, "  {user}")?;
        }
        Ok(())
    }

    fn update_user(&mut self) -> MenuResult<()> {
        let id = self.prompt_number::<UserId>("User id to update: ")?;
        let Some(mut user) = self.service.get_user_by_id(id)? else {
            writeln!(self.output, "User with id {} not found.", id.unwrap_or_default())?;
            return Ok(());
        };
        writeln!(self.output, "Current data: {user}")?;

        let name = self.prompt("New name (blank keeps current): ")?;
        if !name.is_empty() {
            user.name = name;
        }
        let email = self.prompt("New email (blank keeps current): ")?;
        if !email.is_empty() {
            user.email = email;
        }
        let age = self.prompt_number::<u32>("New age (0 keeps current): ")?;
        if let Some(age) = age.filter(|age| *age > 0) {
            user.age = age;
        }

        self.service.update_user(&user)?;
        writeln!(
            self.output,
            "User with id {} updated.",
            user.id.unwrap_or_default()
        )?;
        Ok(())
    }

    fn delete_user(&mut self) -> MenuResult<()> {
        let id = self
            .prompt_number::<UserId>("User id to delete: ")?
            .ok_or(ServiceError::Validation(ValidationError::InvalidId(None)))?;
        self.service.delete_user(id)?;
        writeln!(self.output, "User with id {id} deleted.")?;
        Ok(())
    }

    fn prompt(&mut self, label: &str) -> MenuResult<String> {
        write!(self.output, "{label}")?;
        self.output.flush()?;

        let mut buf = Vec::new();
        if self.input.read_until(b'\n', &mut buf)? == 0 {
            return Err(MenuError::EndOfInput);
        }
        let line = String::from_utf8(buf).map_err(|_| MenuError::InvalidInput)?;
        Ok(line.trim().to_string())
    }

    /// Blank input yields `None`; anything unparsable fails the action.
    fn prompt_number<T: FromStr>(&mut self, label: &str) -> MenuResult<Option<T>> {
        let raw = self.prompt(label)?;
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse::<T>()
            .map(Some)
            .map_err(|_| MenuError::InvalidNumber(raw))
    }

    fn require_number<T: FromStr>(&mut self, label: &str, field: &'static str) -> MenuResult<T> {
        self.prompt_number(label)?.ok_or(MenuError::MissingValue(field))
    }

    fn report(&mut self, action: &str, err: MenuError) -> io::Result<()> {
        match err {
            MenuError::Io(io_err) => Err(io_err),
            other => {
                warn!("event=menu_action module=cli status=error action={action} error={other}");
                writeln!(self.output, "Error: {other}")
            }
        }
    }
}
