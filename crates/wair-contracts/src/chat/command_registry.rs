#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

/// Commands whose first argument is a path and whose remainder is free text.
pub(crate) const PATH_WITH_TEXT_COMMANDS: &[CommandSpec] = &[CommandSpec {
    command: "photo",
    action: "critique_photo",
}];

/// Commands taking positional integer arguments.
pub(crate) const INDEX_COMMANDS: &[CommandSpec] = &[CommandSpec {
    command: "tryon",
    action: "try_on",
}];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "surprise",
        action: "surprise_me",
    },
    CommandSpec {
        command: "history",
        action: "history",
    },
    CommandSpec {
        command: "new",
        action: "new_chat",
    },
    CommandSpec {
        command: "wardrobe",
        action: "list_wardrobe",
    },
    CommandSpec {
        command: "insights",
        action: "insights",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
];

pub const CHAT_HELP_COMMANDS: &[&str] = &[
    "/photo <path> [comment]",
    "/surprise",
    "/tryon <outfit> [photo]",
    "/history",
    "/new",
    "/wardrobe",
    "/insights",
    "/help",
    "/quit",
];
