//! Shared text normalization helpers.
//!
//! Both the reply classifier and the roster column mapper need the same
//! accent-insensitive comparison ("Sí" == "si", "Teléfono" == "telefono").

/// Strip diacritics from vowels, both cases. Other characters pass through.
pub fn strip_diacritics(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'Á' | 'À' | 'Ä' | 'Â' => 'A',
            'É' | 'È' | 'Ë' | 'Ê' => 'E',
            'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
            'Ó' | 'Ò' | 'Ö' | 'Ô' => 'O',
            'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
            other => other,
        })
        .collect()
}

/// Lowercase, trim and strip diacritics in one pass.
pub fn normalize_token(input: &str) -> String {
    strip_diacritics(input.trim()).to_lowercase()
}
