//! Acknowledgment texts sent back after an inbound reply
//!
//! Free-form text is allowed here because the contact's own message opened
//! the 24-hour service window. Sends are fire-and-forget: a failed
//! acknowledgment never affects the recorded reply.

/// Thank-you message after a recorded yes/no answer
#[must_use]
pub fn thank_you_text() -> &'static str {
    "¡Muchas gracias por tu respuesta! 🙏\n\n\
     Hemos registrado tu confirmación correctamente. \
     Si tienes alguna pregunta adicional, no dudes en contactarnos. \
     ¡Que tengas un excelente día!"
}

/// Guidance message after an unclassifiable reply from a known contact
#[must_use]
pub fn invalid_reply_text() -> &'static str {
    "⚠️ Solo se aceptan respuestas de *Sí* o *No*.\n\n\
     Por favor, responde con:\n\
     • *Sí* (o Si, yes, y)\n\
     • *No* (o no, n)\n\n\
     Gracias por tu comprensión."
}
