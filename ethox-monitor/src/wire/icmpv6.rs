use core::fmt;

enum_with_unknown! {
    /// Internet protocol control message type for IPv6.
    pub doc enum Message(u8) {
        /// Destination unreachable.
        DstUnreachable  = 0x01,
        /// Packet too big.
        PktTooBig       = 0x02,
        /// Time exceeded.
        TimeExceeded    = 0x03,
        /// Parameter problem.
        ParamProblem    = 0x04,
        /// Echo Request
        EchoRequest     = 0x80,
        /// Echo Reply
        EchoReply       = 0x81,
        /// Multicast Listener Query
        MldQuery        = 0x82,
        /// Multicast Listener Report
        MldReport       = 0x83,
        /// Multicast Listener Done
        MldDone         = 0x84,
        /// Router Solicitation
        RouterSolicit   = 0x85,
        /// Router Advertisement
        RouterAdvert    = 0x86,
        /// Neighbor Solicitation
        NeighborSolicit = 0x87,
        /// Neighbor Advertisement
        NeighborAdvert  = 0x88,
        /// Redirect
        Redirect        = 0x89,
        /// Router Renumbering
        RouterRenumber  = 0x8a,
        /// Node Information Query
        NodeInfoQuery   = 0x8b,
        /// Node Information Response
        NodeInfoReply   = 0x8c,
        /// Home Agent Address Discovery Request
        HaadRequest     = 0x90,
        /// Home Agent Address Discovery Reply
        HaadReply       = 0x91,
    }
}

impl Message {
    /// Per RFC 4443 § 2.1 all message types with the highest order bit cleared are error messages.
    pub fn is_error(&self) -> bool {
        u8::from(*self) & 0x80 != 0x80
    }

    /// The message type answering this one, if the message is part of a request/reply pair.
    pub fn counterpart(self) -> Option<Message> {
        match self {
            Message::EchoRequest     => Some(Message::EchoReply),
            Message::EchoReply       => Some(Message::EchoRequest),
            Message::RouterSolicit   => Some(Message::RouterAdvert),
            Message::RouterAdvert    => Some(Message::RouterSolicit),
            Message::NeighborSolicit => Some(Message::NeighborAdvert),
            Message::NeighborAdvert  => Some(Message::NeighborSolicit),
            Message::MldQuery        => Some(Message::MldReport),
            Message::MldReport       => Some(Message::MldQuery),
            Message::NodeInfoQuery   => Some(Message::NodeInfoReply),
            Message::NodeInfoReply   => Some(Message::NodeInfoQuery),
            Message::HaadRequest     => Some(Message::HaadReply),
            Message::HaadReply       => Some(Message::HaadRequest),
            _ => None,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Message::DstUnreachable  => write!(f, "destination unreachable"),
            Message::PktTooBig       => write!(f, "packet too big"),
            Message::TimeExceeded    => write!(f, "time exceeded"),
            Message::ParamProblem    => write!(f, "parameter problem"),
            Message::EchoReply       => write!(f, "echo reply"),
            Message::EchoRequest     => write!(f, "echo request"),
            Message::MldQuery        => write!(f, "multicast listener query"),
            Message::MldReport       => write!(f, "multicast listener report"),
            Message::MldDone         => write!(f, "multicast listener done"),
            Message::RouterSolicit   => write!(f, "router solicitation"),
            Message::RouterAdvert    => write!(f, "router advertisement"),
            Message::NeighborSolicit => write!(f, "neighbor solicitation"),
            Message::NeighborAdvert  => write!(f, "neighbor advert"),
            Message::Redirect        => write!(f, "redirect"),
            Message::RouterRenumber  => write!(f, "router renumbering"),
            Message::NodeInfoQuery   => write!(f, "node information query"),
            Message::NodeInfoReply   => write!(f, "node information reply"),
            Message::HaadRequest     => write!(f, "home agent address discovery request"),
            Message::HaadReply       => write!(f, "home agent address discovery reply"),
            Message::Unknown(id)     => write!(f, "{}", id)
        }
    }
}
