use core::fmt;

enum_with_unknown! {
    /// Internet protocol control message type.
    pub doc enum Message(u8) {
        /// Echo reply
        EchoReply      =  0,
        /// Destination unreachable
        DstUnreachable =  3,
        /// Source quench (deprecated)
        SourceQuench   =  4,
        /// Message redirect
        Redirect       =  5,
        /// Echo request
        EchoRequest    =  8,
        /// Router advertisement
        RouterAdvert   =  9,
        /// Router solicitation
        RouterSolicit  = 10,
        /// Time exceeded
        TimeExceeded   = 11,
        /// Parameter problem
        ParamProblem   = 12,
        /// Timestamp
        Timestamp      = 13,
        /// Timestamp reply
        TimestampReply = 14,
        /// Information request (deprecated)
        InfoRequest    = 15,
        /// Information reply (deprecated)
        InfoReply      = 16,
        /// Address mask request (deprecated)
        MaskRequest    = 17,
        /// Address mask reply (deprecated)
        MaskReply      = 18,
        /// Extended Echo Request
        ExtendedEcho   = 42,
        /// Extended Echo Reply
        ExtendedReply  = 43,
    }
}

impl Message {
    /// The message type answering this one, if the message is part of a request/reply pair.
    ///
    /// All other messages, including every error message, are one-way.
    pub fn counterpart(self) -> Option<Message> {
        match self {
            Message::EchoRequest    => Some(Message::EchoReply),
            Message::EchoReply      => Some(Message::EchoRequest),
            Message::Timestamp      => Some(Message::TimestampReply),
            Message::TimestampReply => Some(Message::Timestamp),
            Message::InfoRequest    => Some(Message::InfoReply),
            Message::InfoReply      => Some(Message::InfoRequest),
            Message::RouterSolicit  => Some(Message::RouterAdvert),
            Message::RouterAdvert   => Some(Message::RouterSolicit),
            Message::MaskRequest    => Some(Message::MaskReply),
            Message::MaskReply      => Some(Message::MaskRequest),
            _ => None,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Message::EchoReply      => write!(f, "echo reply"),
            Message::DstUnreachable => write!(f, "destination unreachable"),
            Message::SourceQuench   => write!(f, "source quench"),
            Message::Redirect       => write!(f, "message redirect"),
            Message::EchoRequest    => write!(f, "echo request"),
            Message::RouterAdvert   => write!(f, "router advertisement"),
            Message::RouterSolicit  => write!(f, "router solicitation"),
            Message::TimeExceeded   => write!(f, "time exceeded"),
            Message::ParamProblem   => write!(f, "parameter problem"),
            Message::Timestamp      => write!(f, "timestamp"),
            Message::TimestampReply => write!(f, "timestamp reply"),
            Message::InfoRequest    => write!(f, "information request"),
            Message::InfoReply      => write!(f, "information reply"),
            Message::MaskRequest    => write!(f, "address mask request"),
            Message::MaskReply      => write!(f, "address mask reply"),
            Message::ExtendedEcho   => write!(f, "extended echo request"),
            Message::ExtendedReply  => write!(f, "extended echo reply"),
            Message::Unknown(id)    => write!(f, "{}", id)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pairs_are_symmetric() {
        for value in 0..=u8::MAX {
            let message = Message::from(value);
            if let Some(reply) = message.counterpart() {
                assert_eq!(reply.counterpart(), Some(message));
            }
        }
    }

    #[test]
    fn errors_are_one_way() {
        assert_eq!(Message::DstUnreachable.counterpart(), None);
        assert_eq!(Message::TimeExceeded.counterpart(), None);
        assert_eq!(Message::Redirect.counterpart(), None);
    }
}
