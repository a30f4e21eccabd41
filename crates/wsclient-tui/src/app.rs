use wsclient_core::state::CONNECTION_CLOSED;
use wsclient_core::{ChatLog, Command, Credentials, Registration, SessionEvent, SessionHandle, View};

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Every input field of both views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    LoginUsername,
    LoginPassword,
    RegisterLogin,
    RegisterPassword,
    RegisterEmail,
    Message,
}

/// Which submit action a field belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    Login,
    Register,
    Chat,
}

const HOME_FIELDS: [Field; 5] = [
    Field::LoginUsername,
    Field::LoginPassword,
    Field::RegisterLogin,
    Field::RegisterPassword,
    Field::RegisterEmail,
];

const CHAT_FIELDS: [Field; 1] = [Field::Message];

impl Field {
    pub fn form(&self) -> Form {
        match self {
            Field::LoginUsername | Field::LoginPassword => Form::Login,
            Field::RegisterLogin | Field::RegisterPassword | Field::RegisterEmail => Form::Register,
            Field::Message => Form::Chat,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Field::LoginUsername => "Username",
            Field::LoginPassword | Field::RegisterPassword => "Password",
            Field::RegisterLogin => "Login",
            Field::RegisterEmail => "Email",
            Field::Message => "Message",
        }
    }

    pub fn is_secret(&self) -> bool {
        matches!(self, Field::LoginPassword | Field::RegisterPassword)
    }

    pub fn for_view(view: View) -> &'static [Field] {
        match view {
            View::Home => &HOME_FIELDS,
            View::Chat => &CHAT_FIELDS,
        }
    }
}

/// Single-line text input with a character cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    value: String,
    cursor: usize,
}

impl TextInput {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn char_count(&self) -> usize {
        self.value.chars().count()
    }

    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.value, self.cursor);
        self.value.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.char_count() {
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.char_count());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.char_count();
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// Take the text out, leaving the input empty
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.value)
    }
}

pub struct App {
    pub should_quit: bool,

    /// False until the first verification answer arrives; nothing but a
    /// placeholder is drawn before that
    pub ready: bool,
    pub view: View,
    pub focus: Field,

    // Login form
    pub login_username: TextInput,
    pub login_password: TextInput,

    // Register form
    pub register_login: TextInput,
    pub register_password: TextInput,
    pub register_email: TextInput,

    // Chat form
    pub message: TextInput,
    pub messages: ChatLog,

    // Notice regions
    pub error: Option<String>,
    pub info: Option<String>,

    // A login/register/verify request is in flight
    pub pending: bool,
    pub animation_frame: u8,

    session: SessionHandle,
}

impl App {
    pub fn new(session: SessionHandle) -> Self {
        Self {
            should_quit: false,
            ready: false,
            view: View::Home,
            focus: Field::LoginUsername,

            login_username: TextInput::default(),
            login_password: TextInput::default(),

            register_login: TextInput::default(),
            register_password: TextInput::default(),
            register_email: TextInput::default(),

            message: TextInput::default(),
            messages: ChatLog::new(),

            error: None,
            info: None,

            pending: false,
            animation_frame: 0,

            session,
        }
    }

    pub fn input(&self, field: Field) -> &TextInput {
        match field {
            Field::LoginUsername => &self.login_username,
            Field::LoginPassword => &self.login_password,
            Field::RegisterLogin => &self.register_login,
            Field::RegisterPassword => &self.register_password,
            Field::RegisterEmail => &self.register_email,
            Field::Message => &self.message,
        }
    }

    pub fn input_mut(&mut self, field: Field) -> &mut TextInput {
        match field {
            Field::LoginUsername => &mut self.login_username,
            Field::LoginPassword => &mut self.login_password,
            Field::RegisterLogin => &mut self.register_login,
            Field::RegisterPassword => &mut self.register_password,
            Field::RegisterEmail => &mut self.register_email,
            Field::Message => &mut self.message,
        }
    }

    pub fn focused_input_mut(&mut self) -> &mut TextInput {
        self.input_mut(self.focus)
    }

    pub fn focus_next(&mut self) {
        let fields = Field::for_view(self.view);
        let i = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(i + 1) % fields.len()];
    }

    pub fn focus_prev(&mut self) {
        let fields = Field::for_view(self.view);
        let i = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(i + fields.len() - 1) % fields.len()];
    }

    /// Switch views. Calling it again with the current view keeps focus where it is.
    pub fn show(&mut self, view: View) {
        if !self.ready || self.view != view {
            self.focus = Field::for_view(view)[0];
        }
        self.ready = true;
        self.view = view;
    }

    pub fn tick_animation(&mut self) {
        self.animation_frame = (self.animation_frame + 1) % 3;
    }

    fn dispatch(&mut self, command: Command) {
        if let Err(e) = self.session.send(command) {
            tracing::error!("{}", e);
            self.pending = false;
            self.error = Some(e.to_string());
        }
    }

    /// Ask the session whether the stored cookie is still good
    pub fn verify(&mut self) {
        self.pending = true;
        self.dispatch(Command::Verify);
    }

    /// Submit whichever form owns the focused field
    pub fn submit(&mut self) {
        match self.focus.form() {
            Form::Login => self.submit_login(),
            Form::Register => self.submit_register(),
            Form::Chat => self.submit_message(),
        }
    }

    pub fn submit_login(&mut self) {
        let credentials = Credentials {
            username: self.login_username.value().to_string(),
            password: self.login_password.value().to_string(),
        };
        self.error = None;
        self.info = None;
        self.pending = true;
        self.dispatch(Command::LogIn(credentials));
    }

    pub fn submit_register(&mut self) {
        let registration = Registration {
            username: self.register_login.value().to_string(),
            password: self.register_password.value().to_string(),
            email: self.register_email.value().to_string(),
        };
        self.error = None;
        self.info = None;
        self.pending = true;
        self.dispatch(Command::Register(registration));
    }

    pub fn submit_message(&mut self) {
        if self.message.is_empty() {
            return;
        }
        let text = self.message.take();
        self.focus = Field::Message;
        self.dispatch(Command::Send(text));
    }

    /// The exit form: home view right away, the logout request runs behind it
    pub fn log_out(&mut self) {
        self.message.clear();
        self.error = None;
        self.info = None;
        self.show(View::Home);
        self.dispatch(Command::LogOut);
    }

    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::ViewChanged(view) => {
                self.pending = false;
                if view == View::Chat {
                    self.error = None;
                    self.info = None;
                }
                self.show(view);
            }
            SessionEvent::Error(message) => {
                self.pending = false;
                self.error = Some(message);
            }
            SessionEvent::Info(message) => {
                self.pending = false;
                self.info = Some(message);
            }
            SessionEvent::Message(text) => {
                self.messages.push(text);
            }
            SessionEvent::Disconnected => {
                self.info = Some(CONNECTION_CLOSED.to_string());
            }
        }
    }
}
