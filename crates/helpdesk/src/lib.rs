//! IT support tickets raised by any department and worked by the service desk.

pub mod ticket;

pub use ticket::{
    NewTicket, SupportTicket, TicketCategory, TicketPatch, TicketPriority, TicketQuery,
    TicketStats, TicketStatus, ticket_number, ticket_stats,
};
